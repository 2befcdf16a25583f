// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Reshapes the factory's stock spreadsheet into priced units per channel.

use crate::commands::postponed::postponed_set;
use crate::commands::prices::{PriceTerms, price_terms};
use crate::commands::units::replace_all;
use crate::models::AvailableUnit;
use crate::pricing::{apply_discount, select_individual_discount};
use crate::sheet::{Cell, read_rows};
use crate::utils::{fmt_money, maybe_print_json, pretty_table, required_arg, set_setting};
use anyhow::{Context, Result};
use chrono::{Local, Months, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// `settings` key holding the sheet behind the current available units.
pub const LAST_INGEST_KEY: &str = "ingest.last_file";

/// Rows above the data in the factory export.
const HEADER_ROWS: usize = 8;
/// Column C holds an internal code nobody reads.
const DROPPED_COLUMN: usize = 2;
const COLUMNS: usize = 15;

pub const COLUMN_NAMES: [&str; COLUMNS] = [
    "factory_number",
    "chassis_number",
    "model",
    "color",
    "finance_date",
    "estimated_dispatch",
    "estimated_delivery",
    "reception_date",
    "location",
    "stock_days",
    "price",
    "client_code",
    "client",
    "salesperson",
    "operation",
];

pub fn default_dispatch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 12, 31).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Special,
    SavingsPlan,
    Conventional,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Special, Channel::SavingsPlan, Channel::Conventional];

    /// Sales channel from the factory number prefix; `None` for anything else.
    pub fn from_factory_number(factory_number: &str) -> Option<Self> {
        if factory_number.starts_with('F') {
            Some(Self::Special)
        } else if factory_number.starts_with("TPA") {
            Some(Self::SavingsPlan)
        } else if factory_number.starts_with("YAC") {
            Some(Self::Conventional)
        } else {
            None
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Special => "Special sales (F)",
            Self::SavingsPlan => "Savings plan (TPA)",
            Self::Conventional => "Conventional sales (YAC)",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub channel: Channel,
    pub count: usize,
    pub units: Vec<AvailableUnit>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestOutcome {
    pub buckets: Vec<Bucket>,
    /// Data rows left after dropping postponed units.
    pub total_rows: usize,
    pub priced: usize,
    pub postponed_skipped: usize,
}

impl IngestOutcome {
    pub fn bucket(&self, channel: Channel) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.channel == channel)
    }

    pub fn units(&self) -> impl Iterator<Item = &AvailableUnit> {
        self.buckets.iter().flat_map(|b| b.units.iter())
    }
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let path = required_arg(m, "path")?;
    let rows = read_rows(Path::new(path))?;
    let prices = price_terms(conn)?;
    let postponed = postponed_set(conn)?;
    let outcome = reshape(rows, &prices, &postponed, Local::now().date_naive());
    tracing::info!(
        path,
        rows = outcome.total_rows,
        priced = outcome.priced,
        postponed = outcome.postponed_skipped,
        "spreadsheet reshaped"
    );

    if m.get_flag("save") {
        let units: Vec<AvailableUnit> = outcome.units().cloned().collect();
        replace_all(conn, &units).context("Saving ingested units")?;
        set_setting(conn, LAST_INGEST_KEY, path)?;
    }

    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &outcome)? {
        return Ok(());
    }
    for b in &outcome.buckets {
        println!("{} ({} units)", b.channel.title(), b.count);
        let data = b
            .units
            .iter()
            .map(|u| {
                vec![
                    u.factory_number.clone(),
                    u.model.clone().unwrap_or_default(),
                    u.color.clone().unwrap_or_default(),
                    u.estimated_dispatch.clone().unwrap_or_default(),
                    u.estimated_delivery.clone().unwrap_or_default(),
                    u.location.clone().unwrap_or_default(),
                    fmt_money(&u.price),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Factory", "Model", "Color", "Dispatch", "Delivery", "Location", "Price"],
                data
            )
        );
    }
    println!(
        "{} rows, {} priced, {} postponed skipped{}",
        outcome.total_rows,
        outcome.priced,
        outcome.postponed_skipped,
        if m.get_flag("save") { ", saved as available units" } else { "" }
    );
    Ok(())
}

/// Pure reshaping of raw sheet rows; `today` decides current vs. future discounts.
pub fn reshape(
    rows: Vec<Vec<Cell>>,
    prices: &HashMap<String, PriceTerms>,
    postponed: &HashSet<String>,
    today: NaiveDate,
) -> IngestOutcome {
    let mut data: Vec<Vec<Cell>> = rows
        .into_iter()
        .skip(HEADER_ROWS)
        .map(|mut row| {
            if row.len() > DROPPED_COLUMN {
                row.remove(DROPPED_COLUMN);
            }
            row
        })
        // Blank means blank across the full width, extra columns included.
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|mut row| {
            row.truncate(COLUMNS);
            row
        })
        .collect();
    data.sort_by_cached_key(|row| row.first().and_then(Cell::text).unwrap_or_default());

    let mut outcome = IngestOutcome::default();
    let mut buckets: Vec<(Channel, Vec<AvailableUnit>)> =
        Channel::ALL.iter().map(|c| (*c, Vec::new())).collect();

    for row in data {
        let unit = build_unit(&row, prices, today);
        if postponed.contains(&unit.factory_number) {
            outcome.postponed_skipped += 1;
            continue;
        }
        outcome.total_rows += 1;
        if unit.price > Decimal::ZERO {
            outcome.priced += 1;
        }
        match Channel::from_factory_number(&unit.factory_number) {
            Some(channel) => {
                if let Some((_, units)) = buckets.iter_mut().find(|(c, _)| *c == channel) {
                    units.push(unit);
                }
            }
            None => tracing::debug!(
                factory_number = unit.factory_number.as_str(),
                "no channel for factory number, row dropped"
            ),
        }
    }

    outcome.buckets = buckets
        .into_iter()
        .filter(|(_, units)| !units.is_empty())
        .map(|(channel, units)| Bucket {
            channel,
            count: units.len(),
            units,
        })
        .collect();
    outcome
}

fn cell(row: &[Cell], idx: usize) -> Option<&Cell> {
    row.get(idx).filter(|c| !c.is_empty())
}

fn text_at(row: &[Cell], idx: usize) -> Option<String> {
    cell(row, idx).and_then(Cell::text)
}

/// Serial numbers become ISO dates; text is kept as typed.
fn date_text_at(row: &[Cell], idx: usize) -> Option<String> {
    let c = cell(row, idx)?;
    if matches!(c, Cell::Number(_)) {
        if let Some(d) = c.date() {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    c.text()
}

fn build_unit(row: &[Cell], prices: &HashMap<String, PriceTerms>, today: NaiveDate) -> AvailableUnit {
    let dispatch = cell(row, 5)
        .and_then(Cell::date)
        .unwrap_or_else(default_dispatch);
    let delivery = dispatch
        .checked_add_months(Months::new(1))
        .unwrap_or(dispatch);
    let model = text_at(row, 2);
    let price = model
        .as_deref()
        .and_then(|m| prices.get(m))
        .map(|t| stamped_price(t, dispatch, today))
        .unwrap_or(Decimal::ZERO);

    AvailableUnit {
        factory_number: text_at(row, 0).unwrap_or_default(),
        chassis_number: text_at(row, 1),
        model,
        color: text_at(row, 3),
        finance_date: date_text_at(row, 4),
        estimated_dispatch: Some(dispatch.format("%Y-%m-%d").to_string()),
        estimated_delivery: Some(delivery.format("%Y-%m-%d").to_string()),
        reception_date: date_text_at(row, 7),
        location: text_at(row, 8),
        stock_days: text_at(row, 9),
        price,
        client_code: text_at(row, 11),
        client: text_at(row, 12),
        salesperson: text_at(row, 13),
        operation: text_at(row, 14),
    }
}

fn stamped_price(terms: &PriceTerms, dispatch: NaiveDate, today: NaiveDate) -> Decimal {
    let pct = select_individual_discount(dispatch, today, terms.discount, terms.future_discount);
    if pct > Decimal::ZERO {
        apply_discount(terms.base, pct).round_dp(2)
    } else {
        terms.base
    }
}
