// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pre-sale log: units sold before the factory assigned them.
//!
//! Every entry shares the placeholder factory number, so converting the log
//! into available units always starts by dropping the previous placeholders.

use crate::commands::prices::price_terms;
use crate::commands::units::insert_units;
use crate::error::DeskError;
use crate::models::{AvailableUnit, PRESALE_FACTORY_NUMBER, PresaleEntry};
use crate::pricing::apply_discount;
use crate::utils::{maybe_print_json, pretty_table, required_arg};
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub const PRESALE_LOCATION: &str = "Preventa";
const PRESALE_LEAD_DAYS: i64 = 90;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let items = list(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
                return Ok(());
            }
            let flag = |b: bool| if b { "x" } else { "" }.to_string();
            let data = items
                .into_iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        p.model,
                        p.operation,
                        p.salesperson,
                        p.color,
                        flag(p.informed),
                        flag(p.cancelled),
                        flag(p.assigned),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(
                    &[
                        "Id", "Model", "Operation", "Salesperson", "Color", "Informed", "Cancelled",
                        "Assigned"
                    ],
                    data
                )
            );
        }
        Some(("save", sub)) => {
            let path = required_arg(sub, "file")?;
            let raw = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
            let entries: Vec<PresaleEntry> = serde_json::from_str(&raw)
                .map_err(|e| DeskError::validation(format!("Invalid pre-sale file: {}", e)))?;
            let n = save(conn, &entries)?;
            println!("Saved {} pre-sale entries", n);
        }
        Some(("convert", _)) => {
            let n = convert(conn, Local::now().date_naive())?;
            if n == 0 {
                println!("No pre-sales without salesperson; previous placeholders cleared");
            } else {
                println!("Added {} pre-sale units to available", n);
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn list(conn: &Connection) -> Result<Vec<PresaleEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, model, operation, salesperson, color, informed, cancelled, assigned
         FROM presales ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(PresaleEntry {
            id: r.get(0)?,
            model: r.get(1)?,
            operation: r.get(2)?,
            salesperson: r.get(3)?,
            color: r.get(4)?,
            informed: r.get(5)?,
            cancelled: r.get(6)?,
            assigned: r.get(7)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Replace the log. Placeholder units already in the available set go too,
/// so a cleared log never leaves stale pre-sale units behind.
pub fn save(conn: &mut Connection, entries: &[PresaleEntry]) -> Result<usize> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM available_units WHERE factory_number=?1",
        params![PRESALE_FACTORY_NUMBER],
    )?;
    tx.execute("DELETE FROM presales", [])?;
    for e in entries {
        tx.execute(
            "INSERT INTO presales(factory_number, model, operation, salesperson, color,
                                  informed, cancelled, assigned)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                PRESALE_FACTORY_NUMBER,
                e.model.trim(),
                e.operation.trim(),
                e.salesperson.trim(),
                e.color.trim(),
                e.informed,
                e.cancelled,
                e.assigned
            ],
        )?;
    }
    tx.commit()?;
    tracing::info!(entries = entries.len(), "pre-sale log replaced");
    Ok(entries.len())
}

/// Publish every pre-sale without a salesperson as an available unit.
pub fn convert(conn: &mut Connection, today: NaiveDate) -> Result<usize> {
    let terms = price_terms(conn)?;
    let delivery = (today + Duration::days(PRESALE_LEAD_DAYS))
        .format("%Y-%m-%d")
        .to_string();

    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM available_units WHERE factory_number=?1",
        params![PRESALE_FACTORY_NUMBER],
    )?;
    let pending: Vec<(String, String, String)> = {
        let mut stmt = tx.prepare(
            "SELECT model, operation, color FROM presales
             WHERE TRIM(COALESCE(salesperson,'')) = '' ORDER BY id",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    let units: Vec<AvailableUnit> = pending
        .into_iter()
        .map(|(model, operation, color)| {
            let price = match terms.get(model.trim()) {
                Some(t) if t.discount > Decimal::ZERO => apply_discount(t.base, t.discount),
                Some(t) => t.base,
                None => Decimal::ZERO,
            };
            AvailableUnit {
                factory_number: PRESALE_FACTORY_NUMBER.to_string(),
                model: Some(model),
                color: Some(color),
                location: Some(PRESALE_LOCATION.to_string()),
                estimated_delivery: Some(delivery.clone()),
                price,
                operation: Some(operation),
                ..Default::default()
            }
        })
        .collect();
    insert_units(&tx, &units)?;
    tx.commit()?;
    tracing::info!(units = units.len(), "pre-sales converted to available units");
    Ok(units.len())
}
