// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::DeskError;
use crate::models::AvailableUnit;
use crate::pricing::{DiscountConfig, UnitFacts, is_stock_location, resolve};
use crate::utils::{dec_col, fmt_money, fmt_pct, maybe_print_json, pretty_table, required_arg};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, Utc};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("save", sub)) => {
            let path = required_arg(sub, "file")?;
            let raw = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
            let units: Vec<AvailableUnit> = serde_json::from_str(&raw)
                .map_err(|e| DeskError::validation(format!("Invalid units file: {}", e)))?;
            let n = replace_all(conn, &units)?;
            println!("Saved {} available units", n);
        }
        Some(("revenue", sub)) => revenue_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// An available unit priced with the additional discounts in force now.
#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
    #[serde(flatten)]
    pub unit: AvailableUnit,
    pub family: String,
    pub base_price: Decimal,
    pub individual_discount: Decimal,
    pub additional_discount: Decimal,
    pub discount_details: String,
    pub final_price: Decimal,
}

const UNIT_COLUMNS: &str = "u.factory_number, u.chassis_number, u.model, u.color, u.finance_date,
     u.estimated_dispatch, u.estimated_delivery, u.reception_date, u.location, u.stock_days,
     u.price, u.client_code, u.client, u.salesperson, u.operation";

fn unit_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<AvailableUnit> {
    Ok(AvailableUnit {
        factory_number: r.get(0)?,
        chassis_number: r.get(1)?,
        model: r.get(2)?,
        color: r.get(3)?,
        finance_date: r.get(4)?,
        estimated_dispatch: r.get(5)?,
        estimated_delivery: r.get(6)?,
        reception_date: r.get(7)?,
        location: r.get(8)?,
        stock_days: r.get(9)?,
        price: dec_col(r, 10)?,
        client_code: r.get(11)?,
        client: r.get(12)?,
        salesperson: r.get(13)?,
        operation: r.get(14)?,
    })
}

/// Stored units, newest load first and file order within a load.
pub fn fetch_units(conn: &Connection) -> Result<Vec<AvailableUnit>> {
    let sql = format!(
        "SELECT {} FROM available_units u ORDER BY u.loaded_at DESC, u.id ASC",
        UNIT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], unit_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn reserved_numbers(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT factory_number FROM reserved_units")?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut out = HashSet::new();
    for row in rows {
        out.insert(row?);
    }
    Ok(out)
}

/// Units joined with their model's family and current individual discount,
/// each resolved against `cfg` at `now`.
pub fn fetch_views(
    conn: &Connection,
    cfg: &DiscountConfig,
    now: NaiveDateTime,
    include_reserved: bool,
) -> Result<Vec<UnitView>> {
    let reserved = if include_reserved {
        HashSet::new()
    } else {
        reserved_numbers(conn)?
    };
    let sql = format!(
        "SELECT {}, p.family, p.discount
         FROM available_units u
         LEFT JOIN prices p ON p.model = u.model
         ORDER BY u.loaded_at DESC, u.id ASC",
        UNIT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |r| {
        Ok((
            unit_from_row(r)?,
            r.get::<_, Option<String>>(15)?,
            dec_col(r, 16)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (unit, family, individual) = row?;
        if reserved.contains(&unit.factory_number) {
            continue;
        }
        let facts = UnitFacts {
            factory_number: &unit.factory_number,
            location: unit.location.as_deref(),
            color: unit.color.as_deref(),
            estimated_delivery: unit.estimated_delivery.as_deref(),
        };
        let res = resolve(&facts, unit.price, cfg, now);
        out.push(UnitView {
            family: family.unwrap_or_else(|| "SIN FAMILIA".to_string()),
            base_price: res.base_price,
            individual_discount: individual,
            additional_discount: res.total_pct,
            discount_details: res.breakdown(),
            final_price: res.final_price,
            unit,
        });
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let cfg = DiscountConfig::load(conn)?;
    let views = fetch_views(
        conn,
        &cfg,
        Local::now().naive_local(),
        sub.get_flag("include_reserved"),
    )?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &views)? {
        return Ok(());
    }
    let data = views
        .iter()
        .map(|v| {
            vec![
                v.unit.factory_number.clone(),
                v.unit.model.clone().unwrap_or_default(),
                v.family.clone(),
                v.unit.color.clone().unwrap_or_default(),
                v.unit.location.clone().unwrap_or_default(),
                v.unit.estimated_delivery.clone().unwrap_or_default(),
                fmt_money(&v.base_price),
                fmt_pct(&v.additional_discount),
                fmt_money(&v.final_price),
                v.discount_details.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &[
                "Factory", "Model", "Family", "Color", "Location", "Delivery", "Base", "Extra",
                "Final", "Details"
            ],
            data
        )
    );
    Ok(())
}

/// Swap the whole available set for `units` in one transaction.
pub fn replace_all(conn: &mut Connection, units: &[AvailableUnit]) -> Result<usize> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM available_units", [])?;
    insert_units(&tx, units)?;
    tx.commit()?;
    tracing::info!(units = units.len(), "available units replaced");
    Ok(units.len())
}

/// Append rows as one load stamped now; callers own the surrounding transaction.
pub fn insert_units(conn: &Connection, units: &[AvailableUnit]) -> Result<()> {
    insert_units_at(conn, units, Utc::now().naive_utc())
}

/// Append rows sharing a single `loaded_at`, so listing keeps file order
/// within the load however long the batch takes.
pub fn insert_units_at(
    conn: &Connection,
    units: &[AvailableUnit],
    loaded_at: NaiveDateTime,
) -> Result<()> {
    let stamp = loaded_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let mut stmt = conn.prepare(
        "INSERT INTO available_units(factory_number, chassis_number, model, color, finance_date,
             estimated_dispatch, estimated_delivery, reception_date, location, stock_days,
             price, client_code, client, salesperson, operation, loaded_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
    )?;
    for u in units {
        if u.factory_number.trim().is_empty() {
            return Err(DeskError::validation("Every unit needs a factory number").into());
        }
        stmt.execute(params![
            u.factory_number.trim(),
            u.chassis_number,
            u.model,
            u.color,
            u.finance_date,
            u.estimated_dispatch,
            u.estimated_delivery,
            u.reception_date,
            u.location,
            u.stock_days,
            u.price.to_string(),
            u.client_code,
            u.client,
            u.salesperson,
            u.operation,
            stamp
        ])?;
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueLine {
    pub factory_number: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RevenueBucket {
    pub units: Vec<RevenueLine>,
    pub count: usize,
    pub total: Decimal,
}

impl RevenueBucket {
    fn push(&mut self, line: RevenueLine) {
        self.count += 1;
        self.total += line.price;
        self.units.push(line);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Revenue {
    pub in_stock: RevenueBucket,
    pub not_in_stock: RevenueBucket,
    pub grand_total: Decimal,
    pub total_count: usize,
}

/// Stored prices of unreserved units split by whether they sit in stock.
pub fn revenue(conn: &Connection) -> Result<Revenue> {
    let reserved = reserved_numbers(conn)?;
    let mut out = Revenue::default();
    for unit in fetch_units(conn)? {
        if reserved.contains(&unit.factory_number) {
            continue;
        }
        let in_stock = is_stock_location(unit.location.as_deref().unwrap_or_default());
        let line = RevenueLine {
            factory_number: unit.factory_number,
            model: unit.model,
            location: unit.location,
            price: unit.price,
        };
        if in_stock {
            out.in_stock.push(line);
        } else {
            out.not_in_stock.push(line);
        }
    }
    out.grand_total = out.in_stock.total + out.not_in_stock.total;
    out.total_count = out.in_stock.count + out.not_in_stock.count;
    Ok(out)
}

fn revenue_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let rev = revenue(conn)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rev)? {
        return Ok(());
    }
    let data = vec![
        vec![
            "In stock".to_string(),
            rev.in_stock.count.to_string(),
            fmt_money(&rev.in_stock.total),
        ],
        vec![
            "Not in stock".to_string(),
            rev.not_in_stock.count.to_string(),
            fmt_money(&rev.not_in_stock.total),
        ],
        vec![
            "Total".to_string(),
            rev.total_count.to_string(),
            fmt_money(&rev.grand_total),
        ],
    ];
    println!("{}", pretty_table(&["Bucket", "Units", "Amount"], data));
    Ok(())
}
