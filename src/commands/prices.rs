// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::DeskError;
use crate::models::{PriceEntry, default_exchange_rate};
use crate::pricing::family_for_model;
use crate::utils::{
    dec_col, fmt_money, fmt_pct, maybe_print_json, optional_arg, parse_decimal, pretty_table,
    required_arg,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("set", sub)) => set(conn, sub)?,
        Some(("save", sub)) => save(conn, sub)?,
        Some(("family-discount", sub)) => family_discount(conn, sub)?,
        Some(("assign-families", _)) => {
            let n = assign_families(conn)?;
            println!("Assigned families to {} models", n);
        }
        _ => {}
    }
    Ok(())
}

/// Price terms the ingestion and pre-sale paths need per model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTerms {
    pub base: Decimal,
    pub discount: Decimal,
    pub future_discount: Decimal,
}

pub fn price_terms(conn: &Connection) -> Result<HashMap<String, PriceTerms>> {
    let mut stmt = conn.prepare("SELECT model, price_ars, discount, future_discount FROM prices")?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            PriceTerms {
                base: dec_col(r, 1)?,
                discount: dec_col(r, 2)?,
                future_discount: dec_col(r, 3)?,
            },
        ))
    })?;
    let mut out = HashMap::new();
    for row in rows {
        let (model, terms) = row?;
        out.insert(model, terms);
    }
    Ok(out)
}

pub fn load_prices(conn: &Connection) -> Result<Vec<PriceEntry>> {
    let mut stmt = conn.prepare(
        "SELECT model, price_ars, price_usd, exchange_rate, discount, future_discount,
                visible, discontinued, family
         FROM prices ORDER BY COALESCE(family,'OTROS'), model",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(PriceEntry {
            name: r.get(0)?,
            price_ars: dec_col(r, 1)?,
            price_usd: dec_col(r, 2)?,
            exchange_rate: dec_col(r, 3)?,
            discount: dec_col(r, 4)?,
            future_discount: dec_col(r, 5)?,
            visible: r.get(6)?,
            discontinued: r.get(7)?,
            family: Some(
                r.get::<_, Option<String>>(8)?
                    .unwrap_or_else(|| "OTROS".to_string()),
            ),
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Serialize)]
struct PriceListing {
    models: Vec<PriceEntry>,
    hidden: Vec<String>,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let models = load_prices(conn)?;
    let hidden = models
        .iter()
        .filter(|p| !p.visible)
        .map(|p| p.name.clone())
        .collect();
    let listing = PriceListing { models, hidden };
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &listing)? {
        return Ok(());
    }
    let data = listing
        .models
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.family.clone().unwrap_or_default(),
                fmt_money(&p.price_ars),
                fmt_money(&p.price_usd),
                p.exchange_rate.normalize().to_string(),
                fmt_pct(&p.discount),
                fmt_pct(&p.future_discount),
                if p.visible { "yes" } else { "no" }.to_string(),
                if p.discontinued { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &[
                "Model", "Family", "ARS", "USD", "Rate", "Disc", "Future", "Visible", "Disc'd"
            ],
            data
        )
    );
    Ok(())
}

/// Insert or update one model. Family is derived on first insert only.
pub fn upsert_price(conn: &Connection, p: &PriceEntry) -> Result<()> {
    let name = p.name.trim();
    if name.is_empty() {
        return Err(DeskError::validation("Model name must not be empty").into());
    }
    let family = p
        .family
        .clone()
        .unwrap_or_else(|| family_for_model(name).to_string());
    conn.execute(
        "INSERT INTO prices(model, price_ars, price_usd, exchange_rate, discount, future_discount,
                            visible, discontinued, family)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
         ON CONFLICT(model) DO UPDATE SET
            price_ars=excluded.price_ars,
            price_usd=excluded.price_usd,
            exchange_rate=excluded.exchange_rate,
            discount=excluded.discount,
            future_discount=excluded.future_discount,
            discontinued=excluded.discontinued,
            updated_at=datetime('now')",
        params![
            name,
            p.price_ars.to_string(),
            p.price_usd.to_string(),
            p.exchange_rate.to_string(),
            p.discount.to_string(),
            p.future_discount.to_string(),
            p.visible,
            p.discontinued,
            family
        ],
    )?;
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let model = required_arg(sub, "model")?;
    let existing = load_one(conn, model)?;
    let mut entry = existing.unwrap_or_else(|| PriceEntry {
        name: model.to_string(),
        price_ars: Decimal::ZERO,
        price_usd: Decimal::ZERO,
        exchange_rate: default_exchange_rate(),
        discount: Decimal::ZERO,
        future_discount: Decimal::ZERO,
        visible: true,
        discontinued: false,
        family: None,
    });
    if let Some(v) = optional_arg(sub, "ars") {
        entry.price_ars = parse_decimal(&v)?;
    }
    if let Some(v) = optional_arg(sub, "usd") {
        entry.price_usd = parse_decimal(&v)?;
    }
    if let Some(v) = optional_arg(sub, "rate") {
        entry.exchange_rate = parse_decimal(&v)?;
    }
    if let Some(v) = optional_arg(sub, "discount") {
        entry.discount = parse_percent(&v)?;
    }
    if let Some(v) = optional_arg(sub, "future_discount") {
        entry.future_discount = parse_percent(&v)?;
    }
    if let Some(v) = sub.get_one::<bool>("discontinued") {
        entry.discontinued = *v;
    }
    if sub.get_flag("hide") {
        entry.visible = false;
    }
    if sub.get_flag("show") {
        entry.visible = true;
    }
    upsert_price(conn, &entry)?;
    conn.execute(
        "UPDATE prices SET visible=?1 WHERE model=?2",
        params![entry.visible, entry.name],
    )?;
    println!(
        "Saved {}: ARS {} ({} / future {})",
        entry.name,
        fmt_money(&entry.price_ars),
        fmt_pct(&entry.discount),
        fmt_pct(&entry.future_discount)
    );
    Ok(())
}

fn load_one(conn: &Connection, model: &str) -> Result<Option<PriceEntry>> {
    let entry = conn
        .query_row(
            "SELECT model, price_ars, price_usd, exchange_rate, discount, future_discount,
                    visible, discontinued, family
             FROM prices WHERE model=?1",
            params![model],
            |r| {
                Ok(PriceEntry {
                    name: r.get(0)?,
                    price_ars: dec_col(r, 1)?,
                    price_usd: dec_col(r, 2)?,
                    exchange_rate: dec_col(r, 3)?,
                    discount: dec_col(r, 4)?,
                    future_discount: dec_col(r, 5)?,
                    visible: r.get(6)?,
                    discontinued: r.get(7)?,
                    family: r.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(entry)
}

/// Percent in `0..=100`.
pub fn parse_percent(raw: &str) -> Result<Decimal> {
    let v = parse_decimal(raw)?;
    if v < Decimal::ZERO || v > Decimal::ONE_HUNDRED {
        return Err(DeskError::validation(format!("Percent '{}' must be between 0 and 100", raw.trim())).into());
    }
    Ok(v)
}

#[derive(Debug, Deserialize)]
pub struct PriceBatch {
    #[serde(default, alias = "modelos")]
    pub models: Vec<PriceEntry>,
    #[serde(default, alias = "modelos_ocultos")]
    pub hidden: Vec<String>,
}

/// Bulk save from the admin screen: upsert every model, then reset
/// visibility so that exactly the `hidden` names are hidden.
pub fn save_batch(conn: &mut Connection, batch: &PriceBatch) -> Result<usize> {
    let tx = conn.transaction()?;
    for p in &batch.models {
        upsert_price(&tx, p).with_context(|| format!("Saving model '{}'", p.name))?;
    }
    tx.execute("UPDATE prices SET visible=1", [])?;
    for name in &batch.hidden {
        tx.execute(
            "UPDATE prices SET visible=0 WHERE model=?1",
            params![name.trim()],
        )?;
    }
    tx.commit()?;
    tracing::info!(
        models = batch.models.len(),
        hidden = batch.hidden.len(),
        "price list saved"
    );
    Ok(batch.models.len())
}

fn save(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = required_arg(sub, "file")?;
    let raw = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
    let batch: PriceBatch =
        serde_json::from_str(&raw).map_err(|e| DeskError::validation(format!("Invalid price file: {}", e)))?;
    let n = save_batch(conn, &batch)?;
    println!("Saved {} models ({} hidden)", n, batch.hidden.len());
    Ok(())
}

/// Set the current individual discount of every model in `family`.
pub fn apply_family_discount(conn: &Connection, family: &str, pct: Decimal) -> Result<usize> {
    let family = family.trim();
    if family.is_empty() {
        return Err(DeskError::validation("Family not specified").into());
    }
    let n = conn.execute(
        "UPDATE prices SET discount=?1, updated_at=datetime('now') WHERE family=?2",
        params![pct.to_string(), family],
    )?;
    tracing::info!(family, discount = %pct, models = n, "family discount applied");
    Ok(n)
}

fn family_discount(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let family = required_arg(sub, "family")?;
    let pct = match optional_arg(sub, "discount") {
        Some(v) => parse_percent(&v)?,
        None => Decimal::ZERO,
    };
    let n = apply_family_discount(conn, family, pct)?;
    println!("Applied {} to {} models of {}", fmt_pct(&pct), n, family);
    Ok(())
}

pub fn assign_families(conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction()?;
    let models: Vec<(i64, String)> = {
        let mut stmt = tx.prepare("SELECT id, model FROM prices")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    for (id, model) in &models {
        tx.execute(
            "UPDATE prices SET family=?1 WHERE id=?2",
            params![family_for_model(model), id],
        )?;
    }
    tx.commit()?;
    Ok(models.len())
}
