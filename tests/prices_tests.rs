// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use dealerdesk::commands::prices;
use dealerdesk::error::DeskError;
use dealerdesk::{cli, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn run(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["dealerdesk", "prices"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    match matches.subcommand() {
        Some(("prices", prices_m)) => prices::handle(conn, prices_m),
        _ => panic!("no prices subcommand"),
    }
}

fn entry(conn: &Connection, model: &str) -> dealerdesk::models::PriceEntry {
    prices::load_prices(conn)
        .unwrap()
        .into_iter()
        .find(|p| p.name == model)
        .unwrap()
}

#[test]
fn set_creates_then_updates_a_model() {
    let mut conn = db::open_in_memory().unwrap();
    run(
        &mut conn,
        &["set", "HILUX 4X2 DX", "--ars", "30000000", "--discount", "4"],
    )
    .unwrap();
    let p = entry(&conn, "HILUX 4X2 DX");
    assert_eq!(p.price_ars, d("30000000"));
    assert_eq!(p.discount, d("4"));
    assert_eq!(p.family.as_deref(), Some("HILUX"));
    assert!(p.visible);

    run(
        &mut conn,
        &[
            "set",
            "HILUX 4X2 DX",
            "--future-discount",
            "6.5",
            "--discontinued",
            "true",
            "--hide",
        ],
    )
    .unwrap();
    let p = entry(&conn, "HILUX 4X2 DX");
    assert_eq!(p.price_ars, d("30000000"));
    assert_eq!(p.future_discount, d("6.5"));
    assert!(p.discontinued);
    assert!(!p.visible);
}

#[test]
fn percent_outside_range_is_a_validation_error() {
    let mut conn = db::open_in_memory().unwrap();
    let err = run(&mut conn, &["set", "YARIS XS", "--discount", "120"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DeskError>(),
        Some(DeskError::Validation(_))
    ));
    assert!(prices::load_prices(&conn).unwrap().is_empty());
}

#[test]
fn batch_save_resets_visibility_to_the_hidden_list() {
    let mut conn = db::open_in_memory().unwrap();
    run(&mut conn, &["set", "SW4 SRX", "--ars", "1", "--hide"]).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"modelos":[
            {{"nombre":"COROLLA XEI","price_ars":"28000000","discount":"3"}},
            {{"name":"COROLLA CROSS SEG","price_ars":"35000000"}}
        ],
        "modelos_ocultos":["COROLLA XEI"]}}"#
    )
    .unwrap();
    file.flush().unwrap();
    let path = file.path().to_str().unwrap().to_string();
    run(&mut conn, &["save", "--file", &path]).unwrap();

    let all = prices::load_prices(&conn).unwrap();
    assert_eq!(all.len(), 3);
    assert!(!entry(&conn, "COROLLA XEI").visible);
    assert!(entry(&conn, "SW4 SRX").visible);
    assert_eq!(
        entry(&conn, "COROLLA CROSS SEG").family.as_deref(),
        Some("COROLLA CROSS")
    );
    assert_eq!(entry(&conn, "COROLLA XEI").family.as_deref(), Some("COROLLA"));
}

#[test]
fn family_discount_touches_only_that_family() {
    let mut conn = db::open_in_memory().unwrap();
    run(&mut conn, &["set", "YARIS XLS", "--discount", "1"]).unwrap();
    run(&mut conn, &["set", "YARIS S", "--discount", "2"]).unwrap();
    run(&mut conn, &["set", "HIACE FURGON", "--discount", "5"]).unwrap();

    run(&mut conn, &["family-discount", "YARIS", "7.5"]).unwrap();
    assert_eq!(entry(&conn, "YARIS XLS").discount, d("7.5"));
    assert_eq!(entry(&conn, "YARIS S").discount, d("7.5"));
    assert_eq!(entry(&conn, "HIACE FURGON").discount, d("5"));

    run(&mut conn, &["family-discount", "YARIS"]).unwrap();
    assert_eq!(entry(&conn, "YARIS S").discount, Decimal::ZERO);
}

#[test]
fn assign_families_recomputes_every_tag() {
    let mut conn = db::open_in_memory().unwrap();
    run(&mut conn, &["set", "GR YARIS", "--ars", "1"]).unwrap();
    run(&mut conn, &["set", "LAND CRUISER 300", "--ars", "1"]).unwrap();
    conn.execute("UPDATE prices SET family=NULL", []).unwrap();

    let n = prices::assign_families(&mut conn).unwrap();
    assert_eq!(n, 2);
    assert_eq!(entry(&conn, "GR YARIS").family.as_deref(), Some("YARIS GR"));
    assert_eq!(
        entry(&conn, "LAND CRUISER 300").family.as_deref(),
        Some("LAND CRUISER")
    );
}

#[test]
fn price_terms_feed_ingestion() {
    let mut conn = db::open_in_memory().unwrap();
    run(
        &mut conn,
        &["set", "RAV4 HV", "--ars", "50000", "--discount", "2", "--future-discount", "4"],
    )
    .unwrap();
    let terms = prices::price_terms(&conn).unwrap();
    let t = terms.get("RAV4 HV").unwrap();
    assert_eq!(t.base, d("50000"));
    assert_eq!(t.discount, d("2"));
    assert_eq!(t.future_discount, d("4"));
}
