// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use dealerdesk::commands::observations;
use dealerdesk::error::DeskError;
use dealerdesk::{cli, db};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn seeded_zones_and_matrix() {
    let conn = db::open_in_memory().unwrap();
    let zones = observations::zone_days(&conn).unwrap();
    assert_eq!(zones.len(), 3);
    assert_eq!((zones[1].zone, zones[1].standard_days, zones[1].deviation_days), (2, 10, 3));

    let matrix = observations::code_matrix(&conn).unwrap();
    assert_eq!(matrix.len(), 17);
    assert!(observations::arrival_zone_violations(&conn).unwrap().is_empty());
}

#[test]
fn set_zone_via_cli_upserts() {
    let mut conn = db::open_in_memory().unwrap();
    let matches = cli::build_cli().get_matches_from([
        "dealerdesk",
        "observations",
        "set-zone",
        "4",
        "20",
        "6",
    ]);
    if let Some(("observations", obs_m)) = matches.subcommand() {
        observations::handle(&mut conn, obs_m).unwrap();
    } else {
        panic!("no observations subcommand");
    }
    let zones = observations::zone_days(&conn).unwrap();
    assert_eq!(zones.len(), 4);
    assert_eq!(zones[3].standard_days, 20);
}

#[test]
fn regressions_are_counted_and_flag_suspicious_operations() {
    let mut conn = db::open_in_memory().unwrap();

    let first = observations::record_change(&mut conn, "OP-1", "3", 2, "Laura").unwrap();
    assert_eq!(first.previous_zone, None);
    assert!(!first.is_regression);

    let forward = observations::record_change(&mut conn, "OP-1", "4", 3, "Laura").unwrap();
    assert_eq!(forward.previous_code.as_deref(), Some("3"));
    assert_eq!(forward.previous_zone, Some(2));
    assert!(!forward.is_regression);

    let back = observations::record_change(&mut conn, "OP-1", "2", 1, "Pablo").unwrap();
    assert!(back.is_regression);
    let stats = observations::operation_stats(&conn, "OP-1").unwrap();
    assert_eq!(stats.changes, 3);
    assert_eq!(stats.regressions, 1);
    assert!(!stats.suspicious);

    // Same zone is not a regression
    let same = observations::record_change(&mut conn, "OP-1", "2", 1, "Pablo").unwrap();
    assert!(!same.is_regression);

    observations::record_change(&mut conn, "OP-1", "4", 3, "Laura").unwrap();
    observations::record_change(&mut conn, "OP-1", "1", 2, "Pablo").unwrap();
    let stats = observations::operation_stats(&conn, "OP-1").unwrap();
    assert_eq!(stats.changes, 6);
    assert_eq!(stats.regressions, 2);
    assert!(stats.suspicious);

    let untouched = observations::operation_stats(&conn, "OP-2").unwrap();
    assert_eq!(untouched.changes, 0);
}

#[test]
fn zone_outside_range_is_rejected_without_side_effects() {
    let mut conn = db::open_in_memory().unwrap();
    let err = observations::record_change(&mut conn, "OP-9", "1", 5, "Laura").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DeskError>(),
        Some(DeskError::Validation(_))
    ));
    let audit: i64 = conn
        .query_row("SELECT COUNT(*) FROM observation_audit", [], |r| r.get(0))
        .unwrap();
    assert_eq!(audit, 0);
}

#[test]
fn save_matrix_accepts_editor_payload() {
    let mut conn = db::open_in_memory().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "{}",
        json!({"matriz": [
            {"clase": "CLASE Z", "zona": 1, "codigos": "1,2", "es_zona_arribo": "false"},
            {"clase": "CLASE Z", "zona": 2, "codigos": 5, "es_zona_arribo": 1}
        ]})
    )
    .unwrap();
    file.flush().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let matches = cli::build_cli().get_matches_from([
        "dealerdesk",
        "observations",
        "save-matrix",
        "--file",
        &path,
    ]);
    if let Some(("observations", obs_m)) = matches.subcommand() {
        observations::handle(&mut conn, obs_m).unwrap();
    } else {
        panic!("no observations subcommand");
    }

    let matrix = observations::code_matrix(&conn).unwrap();
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix[1].codes, "5");
    assert!(matrix[1].is_arrival);
    assert!(!matrix[0].is_arrival);
}

#[test]
fn invalid_matrix_row_keeps_the_old_matrix() {
    let mut conn = db::open_in_memory().unwrap();
    let rows = vec![
        json!({"class": "CLASE Z", "zone": 1, "codes": "1", "is_arrival": true}),
        json!({"class": "CLASE Z", "zone": 7, "codes": "1"}),
    ];
    let err = observations::save_matrix(&mut conn, &rows).unwrap_err();
    assert!(err.to_string().contains("Matrix row 1"));
    assert_eq!(observations::code_matrix(&conn).unwrap().len(), 17);

    let dup = vec![
        json!({"class": "CLASE Z", "zone": 1, "is_arrival": true}),
        json!({"class": "CLASE Z", "zone": 1}),
    ];
    let err = observations::save_matrix(&mut conn, &dup).unwrap_err();
    assert!(err.to_string().contains("Duplicate matrix cell"));
    assert_eq!(observations::code_matrix(&conn).unwrap().len(), 17);
}

#[test]
fn empty_matrix_document_is_rejected() {
    assert!(observations::matrix_rows(&json!({"matrix": []})).is_err());
    assert!(observations::matrix_rows(&json!("nope")).is_err());
    assert_eq!(
        observations::matrix_rows(&json!([{"class": "A", "zone": 1}]))
            .unwrap()
            .len(),
        1
    );
}
