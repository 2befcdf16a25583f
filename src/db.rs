// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Dealerdesk", "dealerdesk"));

/// Colors the price team discounts most often; seeded at zero.
const DEFAULT_COLORS: [&str; 7] = [
    "super_blanco",
    "blanco_perlado",
    "gris_plata",
    "gris_azulado",
    "gris_oscuro",
    "rojo_metalizado",
    "negro_mica",
];

/// (zone, standard days, deviation days)
const DEFAULT_ZONE_DAYS: [(i64, i64, i64); 3] = [(1, 5, 2), (2, 10, 3), (3, 15, 5)];

/// (class, zone, codes, arrival zone)
const DEFAULT_CODE_MATRIX: [(&str, i64, &str, bool); 17] = [
    ("CLASE A", 1, "1", false),
    ("CLASE A", 2, "1", false),
    ("CLASE A", 3, "0", false),
    ("CLASE A", 4, "3", true),
    ("CLASE B", 1, "2,3", false),
    ("CLASE B", 2, "3", false),
    ("CLASE B", 3, "2,3", false),
    ("CLASE B", 4, "4", true),
    ("CLASE C", 1, "6,4", false),
    ("CLASE C", 2, "4", false),
    ("CLASE C", 3, "0", true),
    ("CLASE D", 1, "5", false),
    ("CLASE D", 2, "0", true),
    ("CLASE E", 1, "8,7", false),
    ("CLASE E", 2, "7", false),
    ("CLASE E", 3, "4", false),
    ("CLASE E", 4, "0", true),
];

pub fn db_path(cfg: &AppConfig) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        return Ok(p.clone());
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("dealerdesk.sqlite"))
}

pub fn open_or_init(cfg: &AppConfig) -> Result<Connection> {
    let path = db_path(cfg)?;
    open_at(&path)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

/// Fully initialized scratch database, used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS prices(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        model TEXT NOT NULL UNIQUE,
        price_ars TEXT NOT NULL DEFAULT '0',
        price_usd TEXT NOT NULL DEFAULT '0',
        exchange_rate TEXT NOT NULL DEFAULT '1000',
        discount TEXT NOT NULL DEFAULT '0',
        future_discount TEXT NOT NULL DEFAULT '0',
        visible INTEGER NOT NULL DEFAULT 1,
        discontinued INTEGER NOT NULL DEFAULT 0,
        family TEXT,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS discount_rules(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL DEFAULT '0',
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(category, key)
    );

    -- Replaced wholesale on every save; no incremental merge
    CREATE TABLE IF NOT EXISTS available_units(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        factory_number TEXT NOT NULL,
        chassis_number TEXT,
        model TEXT,
        color TEXT,
        finance_date TEXT,
        estimated_dispatch TEXT,
        estimated_delivery TEXT,
        reception_date TEXT,
        location TEXT,
        stock_days TEXT,
        price TEXT NOT NULL DEFAULT '0',
        client_code TEXT,
        client TEXT,
        salesperson TEXT,
        operation TEXT,
        loaded_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_available_factory ON available_units(factory_number);

    CREATE TABLE IF NOT EXISTS reserved_units(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        factory_number TEXT NOT NULL UNIQUE,
        salesperson TEXT NOT NULL,
        added_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS postponed_units(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        factory_number TEXT NOT NULL UNIQUE,
        reason TEXT,
        added_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS presales(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        factory_number TEXT NOT NULL DEFAULT 'YAC999999999',
        model TEXT NOT NULL DEFAULT '',
        operation TEXT NOT NULL DEFAULT '',
        salesperson TEXT NOT NULL DEFAULT '',
        color TEXT NOT NULL DEFAULT '',
        informed INTEGER NOT NULL DEFAULT 0,
        cancelled INTEGER NOT NULL DEFAULT 0,
        assigned INTEGER NOT NULL DEFAULT 0,
        loaded_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('admin','user')),
        full_name TEXT,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        perm_planning INTEGER NOT NULL DEFAULT 0,
        perm_sales INTEGER NOT NULL DEFAULT 0,
        perm_paperwork INTEGER NOT NULL DEFAULT 0,
        perm_deliveries INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        last_login TEXT
    );

    CREATE TABLE IF NOT EXISTS zone_days(
        zone INTEGER PRIMARY KEY,
        standard_days INTEGER NOT NULL DEFAULT 0,
        deviation_days INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS code_matrix(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        class TEXT NOT NULL,
        zone INTEGER NOT NULL CHECK(zone BETWEEN 1 AND 4),
        codes TEXT NOT NULL DEFAULT '',
        is_arrival INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(class, zone)
    );

    CREATE TABLE IF NOT EXISTS observation_audit(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        operation TEXT NOT NULL,
        previous_code TEXT,
        new_code TEXT,
        previous_zone INTEGER,
        new_zone INTEGER,
        executive TEXT,
        is_regression INTEGER NOT NULL DEFAULT 0,
        changed_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_audit_operation ON observation_audit(operation);

    CREATE TABLE IF NOT EXISTS operation_stats(
        operation TEXT PRIMARY KEY,
        changes INTEGER NOT NULL DEFAULT 0,
        regressions INTEGER NOT NULL DEFAULT 0,
        suspicious INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS bi_registrations(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL CHECK(kind IN ('brand','model')),
        location TEXT NOT NULL,
        name TEXT NOT NULL,
        period TEXT NOT NULL, -- YYYY-MM
        quantity INTEGER NOT NULL DEFAULT 0,
        loaded_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(kind, location, name, period)
    );
    CREATE INDEX IF NOT EXISTS idx_registrations_period ON bi_registrations(period);

    CREATE TABLE IF NOT EXISTS bi_deliveries(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        delivery_note TEXT NOT NULL,
        delivered_on TEXT NOT NULL,
        model TEXT NOT NULL DEFAULT '',
        factory_number TEXT NOT NULL,
        channel TEXT NOT NULL,
        branch TEXT NOT NULL,
        loaded_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(delivery_note, factory_number)
    );
    CREATE INDEX IF NOT EXISTS idx_deliveries_date ON bi_deliveries(delivered_on);

    CREATE TABLE IF NOT EXISTS retail_plan(
        year INTEGER NOT NULL,
        family TEXT NOT NULL,
        conventional INTEGER NOT NULL DEFAULT 0,
        special INTEGER NOT NULL DEFAULT 0,
        savings_plan INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY(year, family)
    );

    CREATE TABLE IF NOT EXISTS bi_uploads(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL,
        kind TEXT NOT NULL,
        rows INTEGER NOT NULL DEFAULT 0,
        username TEXT,
        loaded_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    seed_defaults(conn)?;
    Ok(())
}

fn seed_defaults(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut rule = tx.prepare(
            "INSERT OR IGNORE INTO discount_rules(category, key, value) VALUES (?1,?2,?3)",
        )?;
        rule.execute(params!["stock", "stock_discount", "0"])?;
        for color in DEFAULT_COLORS {
            rule.execute(params!["color", color, "0"])?;
        }
        rule.execute(params!["age", "months", "3"])?;
        rule.execute(params!["age", "discount", "0"])?;

        let zones: i64 = tx.query_row("SELECT COUNT(*) FROM zone_days", [], |r| r.get(0))?;
        if zones == 0 {
            for (zone, standard, deviation) in DEFAULT_ZONE_DAYS {
                tx.execute(
                    "INSERT INTO zone_days(zone, standard_days, deviation_days) VALUES (?1,?2,?3)",
                    params![zone, standard, deviation],
                )?;
            }
        }

        let cells: i64 = tx.query_row("SELECT COUNT(*) FROM code_matrix", [], |r| r.get(0))?;
        if cells == 0 {
            for (class, zone, codes, arrival) in DEFAULT_CODE_MATRIX {
                tx.execute(
                    "INSERT INTO code_matrix(class, zone, codes, is_arrival) VALUES (?1,?2,?3,?4)",
                    params![class, zone, codes, arrival],
                )?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}
