// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::DeskError;
use crate::pricing::{
    AGE_CATEGORY, AGE_MONTHS_KEY, COLOR_CATEGORY, DiscountConfig, STOCK_CATEGORY, normalize_color,
};
use crate::utils::{maybe_print_json, parse_decimal, pretty_table, required_arg};
use anyhow::Result;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => {
            let cfg = DiscountConfig::load(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cfg)? {
                return Ok(());
            }
            let mut data = Vec::new();
            for (category, keys) in cfg.groups() {
                for (key, value) in keys {
                    data.push(vec![category.clone(), key.clone(), value.normalize().to_string()]);
                }
            }
            println!("{}", pretty_table(&["Category", "Key", "Value"], data));
        }
        Some(("set", sub)) => {
            let category = required_arg(sub, "category")?;
            let key = required_arg(sub, "key")?;
            let value = parse_decimal(required_arg(sub, "value")?)?;
            let key = set_rule(conn, category, key, value)?;
            println!("Set {}.{} = {}", category.to_lowercase(), key, value.normalize());
        }
        _ => {}
    }
    Ok(())
}

/// Upsert one additional-discount setting; color keys are normalized.
///
/// Returns the key as stored.
pub fn set_rule(conn: &Connection, category: &str, key: &str, value: Decimal) -> Result<String> {
    let category = category.trim().to_lowercase();
    if ![STOCK_CATEGORY, COLOR_CATEGORY, AGE_CATEGORY].contains(&category.as_str()) {
        return Err(DeskError::validation(format!(
            "Unknown discount category '{}' (use stock|color|age)",
            category
        ))
        .into());
    }
    if value < Decimal::ZERO {
        return Err(DeskError::validation("Discount values must not be negative").into());
    }
    let is_months = category == AGE_CATEGORY && key.trim() == AGE_MONTHS_KEY;
    if !is_months && value > Decimal::ONE_HUNDRED {
        return Err(DeskError::validation("Percent must be between 0 and 100").into());
    }
    if is_months && value.fract() != Decimal::ZERO {
        return Err(DeskError::validation("Age threshold must be a whole number of months").into());
    }
    let key = if category == COLOR_CATEGORY {
        normalize_color(key)
    } else {
        key.trim().to_string()
    };
    conn.execute(
        "INSERT INTO discount_rules(category, key, value) VALUES (?1,?2,?3)
         ON CONFLICT(category, key) DO UPDATE SET value=excluded.value, updated_at=datetime('now')",
        params![category, key, value.to_string()],
    )?;
    tracing::info!(category = category.as_str(), key = key.as_str(), value = %value, "discount rule updated");
    Ok(key)
}
