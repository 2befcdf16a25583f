// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{DeskError, is_unique_violation};
use crate::models::PostponedUnit;
use crate::utils::{maybe_print_json, optional_arg, pretty_table, required_arg};
use anyhow::Result;
use rusqlite::{Connection, params};
use std::collections::HashSet;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let factory = required_arg(sub, "factory_number")?;
            add(conn, factory, optional_arg(sub, "reason").as_deref())?;
            println!("Postponed {}", factory);
        }
        Some(("list", sub)) => {
            let items = list(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
                return Ok(());
            }
            let data = items
                .into_iter()
                .map(|p| vec![p.factory_number, p.reason.unwrap_or_default(), p.added_at])
                .collect();
            println!("{}", pretty_table(&["Factory", "Reason", "Added"], data));
        }
        Some(("rm", sub)) => {
            let factory = required_arg(sub, "factory_number")?;
            remove(conn, factory)?;
            println!("Removed {} from postponed units", factory);
        }
        _ => {}
    }
    Ok(())
}

pub fn add(conn: &Connection, factory_number: &str, reason: Option<&str>) -> Result<()> {
    let factory_number = factory_number.trim();
    if factory_number.is_empty() {
        return Err(DeskError::validation("Factory number must not be empty").into());
    }
    match conn.execute(
        "INSERT INTO postponed_units(factory_number, reason) VALUES (?1, ?2)",
        params![factory_number, reason.map(str::trim)],
    ) {
        Ok(_) => {
            tracing::info!(factory_number, "unit postponed");
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => Err(DeskError::conflict(format!(
            "Factory number '{}' is already postponed",
            factory_number
        ))
        .into()),
        Err(e) => Err(e.into()),
    }
}

pub fn remove(conn: &Connection, factory_number: &str) -> Result<()> {
    let factory_number = factory_number.trim();
    let n = conn.execute(
        "DELETE FROM postponed_units WHERE factory_number=?1",
        params![factory_number],
    )?;
    if n == 0 {
        return Err(DeskError::NotFound(format!("Postponed unit '{}'", factory_number)).into());
    }
    tracing::info!(factory_number, "unit no longer postponed");
    Ok(())
}

/// Newest first.
pub fn list(conn: &Connection) -> Result<Vec<PostponedUnit>> {
    let mut stmt = conn.prepare(
        "SELECT factory_number, reason, added_at FROM postponed_units
         ORDER BY added_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(PostponedUnit {
            factory_number: r.get(0)?,
            reason: r.get(1)?,
            added_at: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Trimmed factory numbers the ingestion must skip.
pub fn postponed_set(conn: &Connection) -> Result<HashSet<String>> {
    Ok(list(conn)?
        .into_iter()
        .map(|p| p.factory_number.trim().to_string())
        .collect())
}
