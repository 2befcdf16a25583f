// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::units::fetch_views;
use crate::error::DeskError;
use crate::pricing::DiscountConfig;
use crate::utils::required_arg;
use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("units", sub)) => export_units(conn, sub),
        _ => Ok(()),
    }
}

fn export_units(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = required_arg(sub, "format")?.to_lowercase();
    let out = required_arg(sub, "out")?;
    if fmt != "csv" && fmt != "json" {
        return Err(DeskError::validation(format!("Unknown format: {} (use csv|json)", fmt)).into());
    }

    let cfg = DiscountConfig::load(conn)?;
    let views = fetch_views(
        conn,
        &cfg,
        Local::now().naive_local(),
        sub.get_flag("include_reserved"),
    )?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr =
                csv::Writer::from_path(out).with_context(|| format!("Create {}", out))?;
            wtr.write_record([
                "factory_number",
                "chassis_number",
                "model",
                "family",
                "color",
                "location",
                "estimated_dispatch",
                "estimated_delivery",
                "base_price",
                "additional_discount",
                "final_price",
                "discount_details",
                "client",
                "salesperson",
                "operation",
            ])?;
            for v in &views {
                let u = &v.unit;
                wtr.write_record([
                    u.factory_number.clone(),
                    u.chassis_number.clone().unwrap_or_default(),
                    u.model.clone().unwrap_or_default(),
                    v.family.clone(),
                    u.color.clone().unwrap_or_default(),
                    u.location.clone().unwrap_or_default(),
                    u.estimated_dispatch.clone().unwrap_or_default(),
                    u.estimated_delivery.clone().unwrap_or_default(),
                    v.base_price.to_string(),
                    v.additional_discount.normalize().to_string(),
                    v.final_price.round_dp(2).to_string(),
                    v.discount_details.clone(),
                    u.client.clone().unwrap_or_default(),
                    u.salesperson.clone().unwrap_or_default(),
                    u.operation.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            let items: Vec<_> = views
                .iter()
                .map(|v| {
                    json!({
                        "factory_number": v.unit.factory_number,
                        "model": v.unit.model,
                        "family": v.family,
                        "color": v.unit.color,
                        "location": v.unit.location,
                        "estimated_delivery": v.unit.estimated_delivery,
                        "base_price": v.base_price,
                        "additional_discount": v.additional_discount,
                        "final_price": v.final_price.round_dp(2),
                        "discount_details": v.discount_details,
                        "salesperson": v.unit.salesperson,
                        "operation": v.unit.operation,
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)
                .with_context(|| format!("Write {}", out))?;
        }
    }
    tracing::info!(units = views.len(), format = fmt.as_str(), out, "units exported");
    println!("Exported {} units to {}", views.len(), out);
    Ok(())
}
