// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Paperwork observation codes: zone timings, the class/zone code matrix and
//! the per-operation audit trail with regression tracking.

use crate::error::DeskError;
use crate::models::{CodeMatrixRow, OperationStats, ZoneDays};
use crate::utils::{maybe_print_json, pretty_table, required_arg};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde_json::Value;

pub const MIN_ZONE: i64 = 1;
pub const MAX_ZONE: i64 = 4;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("zones", sub)) => {
            let zones = zone_days(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &zones)? {
                return Ok(());
            }
            let data = zones
                .into_iter()
                .map(|z| {
                    vec![
                        z.zone.to_string(),
                        z.standard_days.to_string(),
                        z.deviation_days.to_string(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Zone", "Standard days", "Deviation days"], data));
        }
        Some(("set-zone", sub)) => {
            let zone = ZoneDays {
                zone: *sub.get_one::<i64>("zone").context("zone required")?,
                standard_days: *sub.get_one::<i64>("standard_days").context("standard days required")?,
                deviation_days: *sub.get_one::<i64>("deviation_days").context("deviation days required")?,
            };
            set_zone_days(conn, &zone)?;
            println!(
                "Zone {}: {} days (+/- {})",
                zone.zone, zone.standard_days, zone.deviation_days
            );
        }
        Some(("matrix", sub)) => {
            let rows = code_matrix(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            let data = rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.class,
                        r.zone.to_string(),
                        r.codes,
                        if r.is_arrival { "arrival" } else { "" }.to_string(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Class", "Zone", "Codes", "Arrival"], data));
        }
        Some(("save-matrix", sub)) => {
            let path = required_arg(sub, "file")?;
            let raw = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
            let doc: Value = serde_json::from_str(&raw)
                .map_err(|e| DeskError::validation(format!("Invalid matrix file: {}", e)))?;
            let rows = matrix_rows(&doc)?;
            let n = save_matrix(conn, rows)?;
            println!("Saved {} matrix rows", n);
        }
        Some(("record", sub)) => {
            let operation = required_arg(sub, "operation")?;
            let code = required_arg(sub, "code")?;
            let zone = *sub.get_one::<i64>("zone").context("zone required")?;
            let executive = required_arg(sub, "executive")?;
            let change = record_change(conn, operation, code, zone, executive)?;
            if maybe_print_json(sub.get_flag("json"), false, &change)? {
                return Ok(());
            }
            if change.is_regression {
                println!(
                    "Recorded {} -> zone {} (REGRESSION from zone {})",
                    operation,
                    zone,
                    change.previous_zone.unwrap_or_default()
                );
            } else {
                println!("Recorded {} -> zone {}", operation, zone);
            }
        }
        Some(("stats", sub)) => {
            let operation = required_arg(sub, "operation")?;
            let stats = operation_stats(conn, operation)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &stats)? {
                return Ok(());
            }
            println!(
                "{}",
                pretty_table(
                    &["Operation", "Changes", "Regressions", "Suspicious"],
                    vec![vec![
                        operation.to_string(),
                        stats.changes.to_string(),
                        stats.regressions.to_string(),
                        if stats.suspicious { "yes" } else { "no" }.to_string(),
                    ]]
                )
            );
        }
        _ => {}
    }
    Ok(())
}

pub fn zone_days(conn: &Connection) -> Result<Vec<ZoneDays>> {
    let mut stmt =
        conn.prepare("SELECT zone, standard_days, deviation_days FROM zone_days ORDER BY zone")?;
    let rows = stmt.query_map([], |r| {
        Ok(ZoneDays {
            zone: r.get(0)?,
            standard_days: r.get(1)?,
            deviation_days: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn set_zone_days(conn: &Connection, z: &ZoneDays) -> Result<()> {
    if z.zone < MIN_ZONE {
        return Err(DeskError::validation(format!("Zone must be positive, got {}", z.zone)).into());
    }
    if z.standard_days < 0 || z.deviation_days < 0 {
        return Err(DeskError::validation("Days must not be negative").into());
    }
    conn.execute(
        "INSERT INTO zone_days(zone, standard_days, deviation_days) VALUES (?1,?2,?3)
         ON CONFLICT(zone) DO UPDATE SET
            standard_days=excluded.standard_days,
            deviation_days=excluded.deviation_days,
            updated_at=datetime('now')",
        params![z.zone, z.standard_days, z.deviation_days],
    )?;
    Ok(())
}

pub fn code_matrix(conn: &Connection) -> Result<Vec<CodeMatrixRow>> {
    let mut stmt =
        conn.prepare("SELECT class, zone, codes, is_arrival FROM code_matrix ORDER BY class, zone")?;
    let rows = stmt.query_map([], |r| {
        Ok(CodeMatrixRow {
            class: r.get(0)?,
            zone: r.get(1)?,
            codes: r.get(2)?,
            is_arrival: r.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// The rows of a matrix document: a bare array or `{"matrix": [...]}`.
pub fn matrix_rows(doc: &Value) -> Result<&[Value]> {
    let rows = match doc {
        Value::Array(rows) => Some(rows),
        Value::Object(map) => map
            .get("matrix")
            .or_else(|| map.get("matriz"))
            .and_then(Value::as_array),
        _ => None,
    };
    match rows {
        Some(rows) if !rows.is_empty() => Ok(rows.as_slice()),
        _ => Err(DeskError::validation("No matrix rows received").into()),
    }
}

fn field<'a>(row: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| row.get(*n)).filter(|v| !v.is_null())
}

/// Arrival flags arrive as booleans, numbers or strings from the editor.
pub fn coerce_flag(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Validate one editor row; `idx` is its position for error messages.
pub fn parse_matrix_row(idx: usize, row: &Value) -> Result<CodeMatrixRow> {
    let invalid = |msg: String| DeskError::validation(format!("Matrix row {}: {}", idx, msg));
    let class = field(row, &["class", "clase"])
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("class must be a non-empty string".into()))?;
    let zone_raw = field(row, &["zone", "zona"]);
    let zone = zone_raw
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid(format!("zone must be an integer, got {}", zone_raw.unwrap_or(&Value::Null))))?;
    if !(MIN_ZONE..=MAX_ZONE).contains(&zone) {
        return Err(invalid(format!("zone {} out of range ({}-{})", zone, MIN_ZONE, MAX_ZONE)).into());
    }
    let codes = match field(row, &["codes", "codigos"]) {
        None => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string().trim().to_string(),
    };
    Ok(CodeMatrixRow {
        class: class.to_string(),
        zone,
        codes,
        is_arrival: coerce_flag(field(row, &["is_arrival", "es_zona_arribo"])),
    })
}

/// Replace the matrix. Every row is validated before anything is written.
pub fn save_matrix(conn: &mut Connection, rows: &[Value]) -> Result<usize> {
    let parsed = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| parse_matrix_row(idx, row))
        .collect::<Result<Vec<_>>>()?;
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM code_matrix", [])?;
    for r in &parsed {
        tx.execute(
            "INSERT INTO code_matrix(class, zone, codes, is_arrival) VALUES (?1,?2,?3,?4)",
            params![r.class, r.zone, r.codes, r.is_arrival],
        )
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                anyhow::Error::new(DeskError::validation(format!(
                    "Duplicate matrix cell {} zone {}",
                    r.class, r.zone
                )))
            } else {
                e.into()
            }
        })?;
    }
    tx.commit()?;
    tracing::info!(rows = parsed.len(), "code matrix replaced");
    Ok(parsed.len())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationChange {
    pub operation: String,
    pub previous_code: Option<String>,
    pub new_code: String,
    pub previous_zone: Option<i64>,
    pub new_zone: i64,
    pub executive: String,
    pub is_regression: bool,
}

/// Append an audit row and bump the operation's counters.
pub fn record_change(
    conn: &mut Connection,
    operation: &str,
    code: &str,
    zone: i64,
    executive: &str,
) -> Result<ObservationChange> {
    let operation = operation.trim();
    if operation.is_empty() {
        return Err(DeskError::validation("Operation must not be empty").into());
    }
    if !(MIN_ZONE..=MAX_ZONE).contains(&zone) {
        return Err(DeskError::validation(format!(
            "Zone {} out of range ({}-{})",
            zone, MIN_ZONE, MAX_ZONE
        ))
        .into());
    }
    let tx = conn.transaction()?;
    let previous: Option<(Option<String>, Option<i64>)> = tx
        .query_row(
            "SELECT new_code, new_zone FROM observation_audit
             WHERE operation=?1 ORDER BY id DESC LIMIT 1",
            params![operation],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let (previous_code, previous_zone) = previous.unwrap_or_default();
    let is_regression = previous_zone.is_some_and(|prev| zone < prev);

    tx.execute(
        "INSERT INTO observation_audit(operation, previous_code, new_code, previous_zone,
                                       new_zone, executive, is_regression)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            operation,
            previous_code,
            code.trim(),
            previous_zone,
            zone,
            executive.trim(),
            is_regression
        ],
    )?;
    tx.execute(
        "INSERT INTO operation_stats(operation, changes, regressions, suspicious)
         VALUES (?1, 1, ?2, 0)
         ON CONFLICT(operation) DO UPDATE SET
            changes = changes + 1,
            regressions = regressions + excluded.regressions,
            suspicious = (regressions + excluded.regressions) > 1,
            updated_at = datetime('now')",
        params![operation, is_regression as i64],
    )?;
    tx.commit()?;
    if is_regression {
        tracing::warn!(operation, zone, previous = ?previous_zone, "observation zone went backwards");
    }
    Ok(ObservationChange {
        operation: operation.to_string(),
        previous_code,
        new_code: code.trim().to_string(),
        previous_zone,
        new_zone: zone,
        executive: executive.trim().to_string(),
        is_regression,
    })
}

/// Counters for `operation`; zeros when it was never recorded.
pub fn operation_stats(conn: &Connection, operation: &str) -> Result<OperationStats> {
    let stats = conn
        .query_row(
            "SELECT changes, regressions, suspicious FROM operation_stats WHERE operation=?1",
            params![operation.trim()],
            |r| {
                Ok(OperationStats {
                    changes: r.get(0)?,
                    regressions: r.get(1)?,
                    suspicious: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(stats.unwrap_or_default())
}

/// Classes whose matrix rows do not carry exactly one arrival zone.
pub fn arrival_zone_violations(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT class, SUM(is_arrival) FROM code_matrix GROUP BY class
         HAVING SUM(is_arrival) != 1 ORDER BY class",
    )?;
    let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arrival_flag_coercion() {
        assert!(coerce_flag(Some(&json!(true))));
        assert!(coerce_flag(Some(&json!("YES"))));
        assert!(coerce_flag(Some(&json!("1"))));
        assert!(coerce_flag(Some(&json!(2))));
        assert!(!coerce_flag(Some(&json!(0))));
        assert!(!coerce_flag(Some(&json!("no"))));
        assert!(!coerce_flag(None));
    }

    #[test]
    fn zone_must_be_an_integer_in_range() {
        let ok = parse_matrix_row(0, &json!({"clase": "CLASE A", "zona": 2, "codigos": " 1,2 "}))
            .unwrap();
        assert_eq!(ok.codes, "1,2");
        assert!(!ok.is_arrival);
        assert!(parse_matrix_row(1, &json!({"class": "A", "zone": "2"})).is_err());
        assert!(parse_matrix_row(2, &json!({"class": "A", "zone": 5})).is_err());
        assert!(parse_matrix_row(3, &json!({"class": " ", "zone": 1})).is_err());
        let err = parse_matrix_row(7, &json!({"class": "A", "zone": 0})).unwrap_err();
        assert!(err.to_string().contains("row 7"));
    }
}
