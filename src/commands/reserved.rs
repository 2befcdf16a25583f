// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{DeskError, is_unique_violation};
use crate::models::ReservedUnit;
use crate::utils::{maybe_print_json, pretty_table, required_arg};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let factory = required_arg(sub, "factory_number")?;
            let salesperson = required_arg(sub, "salesperson")?;
            add(conn, factory, salesperson)?;
            println!("Reserved {} for {}", factory, salesperson);
        }
        Some(("list", sub)) => {
            let items = list(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
                return Ok(());
            }
            let data = items
                .into_iter()
                .map(|r| vec![r.factory_number, r.salesperson, r.added_at])
                .collect();
            println!(
                "{}",
                pretty_table(&["Factory", "Salesperson", "Added"], data)
            );
        }
        Some(("rm", sub)) => {
            let factory = required_arg(sub, "factory_number")?;
            remove(conn, factory)?;
            println!("Released {}", factory);
        }
        _ => {}
    }
    Ok(())
}

pub fn add(conn: &Connection, factory_number: &str, salesperson: &str) -> Result<()> {
    let factory_number = factory_number.trim();
    let salesperson = salesperson.trim();
    if factory_number.is_empty() {
        return Err(DeskError::validation("Factory number must not be empty").into());
    }
    if salesperson.is_empty() {
        return Err(DeskError::validation("Salesperson must not be empty").into());
    }
    match conn.execute(
        "INSERT INTO reserved_units(factory_number, salesperson) VALUES (?1, ?2)",
        params![factory_number, salesperson],
    ) {
        Ok(_) => {
            tracing::info!(factory_number, salesperson, "unit reserved");
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => Err(DeskError::conflict(format!(
            "Factory number '{}' is already reserved",
            factory_number
        ))
        .into()),
        Err(e) => Err(e.into()),
    }
}

pub fn list(conn: &Connection) -> Result<Vec<ReservedUnit>> {
    let mut stmt = conn.prepare(
        "SELECT factory_number, salesperson, added_at FROM reserved_units
         ORDER BY added_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(ReservedUnit {
            factory_number: r.get(0)?,
            salesperson: r.get(1)?,
            added_at: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn remove(conn: &Connection, factory_number: &str) -> Result<()> {
    let n = conn.execute(
        "DELETE FROM reserved_units WHERE factory_number=?1",
        params![factory_number.trim()],
    )?;
    if n == 0 {
        return Err(DeskError::NotFound(format!("Reservation for '{}'", factory_number.trim())).into());
    }
    Ok(())
}
