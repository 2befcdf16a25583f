// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::ingest::LAST_INGEST_KEY;
use crate::commands::observations::arrival_zone_violations;
use crate::models::PRESALE_FACTORY_NUMBER;
use crate::utils::{dec_col, get_setting, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    if let Some(file) = get_setting(conn, LAST_INGEST_KEY)? {
        println!("Units last ingested from {}", file);
    }
    let rows = diagnose(conn)?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// `[issue, detail]` pairs; empty when the store is consistent.
pub fn diagnose(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Units whose model has no price entry
    let mut stmt = conn.prepare(
        "SELECT DISTINCT COALESCE(u.model,'') FROM available_units u
         LEFT JOIN prices p ON p.model = u.model
         WHERE p.id IS NULL ORDER BY 1",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let model: String = r.get(0)?;
        rows.push(vec!["unit_model_without_price".into(), model]);
    }

    // 2) Price entries never tagged with a family
    let mut stmt = conn.prepare(
        "SELECT model FROM prices WHERE family IS NULL OR TRIM(family)='' ORDER BY model",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        rows.push(vec!["model_without_family".into(), r.get(0)?]);
    }

    // 3) Units stamped at zero (model unknown when ingested)
    let mut stmt = conn.prepare(
        "SELECT factory_number, price FROM available_units WHERE factory_number != ?1 ORDER BY factory_number",
    )?;
    let mut cur = stmt.query([PRESALE_FACTORY_NUMBER])?;
    while let Some(r) = cur.next()? {
        let factory: String = r.get(0)?;
        if dec_col(r, 1)? <= Decimal::ZERO {
            rows.push(vec!["unit_zero_price".into(), factory]);
        }
    }

    // 4) Reservations for units no longer available
    let mut stmt = conn.prepare(
        "SELECT r.factory_number, r.salesperson FROM reserved_units r
         WHERE NOT EXISTS (SELECT 1 FROM available_units u WHERE u.factory_number = r.factory_number)
         ORDER BY r.factory_number",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let factory: String = r.get(0)?;
        let salesperson: String = r.get(1)?;
        rows.push(vec![
            "stale_reservation".into(),
            format!("{} ({})", factory, salesperson),
        ]);
    }

    // 5) Matrix classes without exactly one arrival zone
    for (class, arrivals) in arrival_zone_violations(conn)? {
        rows.push(vec![
            "arrival_zone_count".into(),
            format!("{}: {} arrival zones", class, arrivals),
        ]);
    }

    Ok(rows)
}
