// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use dealerdesk::commands::{discounts, reserved, units};
use dealerdesk::models::AvailableUnit;
use dealerdesk::pricing::DiscountConfig;
use dealerdesk::{cli, db};
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn unit(factory: &str, location: &str, color: &str, price: &str) -> AvailableUnit {
    AvailableUnit {
        factory_number: factory.to_string(),
        model: Some("HILUX 4X4 SRX".to_string()),
        color: Some(color.to_string()),
        location: Some(location.to_string()),
        estimated_delivery: Some("2025-06-01".to_string()),
        price: d(price),
        ..Default::default()
    }
}

fn now() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 15)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

#[test]
fn units_save_replaces_the_whole_set() {
    let mut conn = db::open_in_memory().unwrap();
    units::replace_all(&mut conn, &[unit("YAC0", "STOCK", "Rojo", "1")]).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"[{{"factory_number":"YAC1","model":"YARIS XLS","location":"STOCK CENTRAL","price":"100000"}},
            {{"factory_number":"YAC2","model":"HILUX SR","price":"250000.50"}}]"#
    )
    .unwrap();
    file.flush().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let matches =
        cli::build_cli().get_matches_from(["dealerdesk", "units", "save", "--file", &path]);
    if let Some(("units", units_m)) = matches.subcommand() {
        units::handle(&mut conn, units_m).unwrap();
    } else {
        panic!("no units subcommand");
    }

    let stored = units::fetch_units(&conn).unwrap();
    let numbers: Vec<_> = stored.iter().map(|u| u.factory_number.as_str()).collect();
    assert_eq!(numbers, vec!["YAC1", "YAC2"]);
    assert_eq!(stored[1].price, d("250000.50"));
    assert_eq!(stored[0].location.as_deref(), Some("STOCK CENTRAL"));
}

#[test]
fn views_apply_stock_and_color_discounts() {
    let mut conn = db::open_in_memory().unwrap();
    discounts::set_rule(&conn, "stock", "stock_discount", d("5")).unwrap();
    discounts::set_rule(&conn, "color", "Gris Plata", d("3")).unwrap();
    units::replace_all(
        &mut conn,
        &[
            unit("YAC1", "Stock Mendoza", "Gris Plata", "100000"),
            unit("YAC2", "En viaje", "Rojo", "100000"),
        ],
    )
    .unwrap();

    let cfg = DiscountConfig::load(&conn).unwrap();
    let views = units::fetch_views(&conn, &cfg, now(), false).unwrap();
    assert_eq!(views.len(), 2);

    let stocked = &views[0];
    assert_eq!(stocked.additional_discount, d("8"));
    assert_eq!(stocked.final_price, d("92000"));
    assert_eq!(stocked.discount_details, "Stock: 5%, Color: 3%");
    assert_eq!(stocked.family, "SIN FAMILIA");

    let travelling = &views[1];
    assert_eq!(travelling.final_price, d("100000"));
    assert_eq!(travelling.discount_details, "No additional discounts");
}

#[test]
fn age_discount_needs_a_strictly_older_delivery() {
    let mut conn = db::open_in_memory().unwrap();
    discounts::set_rule(&conn, "age", "discount", d("10")).unwrap();
    let mut old = unit("YAC1", "Playa", "Rojo", "1000");
    old.estimated_delivery = Some("2025-03-14".to_string());
    let mut edge = unit("YAC2", "Playa", "Rojo", "1000");
    edge.estimated_delivery = Some("Sat, 15 Mar 2025 09:00:00 GMT".to_string());
    let mut garbage = unit("YAC3", "Playa", "Rojo", "1000");
    garbage.estimated_delivery = Some("pronto".to_string());
    units::replace_all(&mut conn, &[old, edge, garbage]).unwrap();

    let cfg = DiscountConfig::load(&conn).unwrap();
    let views = units::fetch_views(&conn, &cfg, now(), false).unwrap();
    assert_eq!(views[0].final_price, d("900"));
    assert_eq!(views[0].discount_details, "Age: 10%");
    assert_eq!(views[1].final_price, d("1000"));
    assert_eq!(views[2].final_price, d("1000"));
}

#[test]
fn reserved_units_are_hidden_unless_requested() {
    let mut conn = db::open_in_memory().unwrap();
    units::replace_all(
        &mut conn,
        &[unit("YAC1", "STOCK", "Rojo", "10"), unit("YAC2", "STOCK", "Rojo", "20")],
    )
    .unwrap();
    reserved::add(&conn, "YAC2", "Marta").unwrap();

    let cfg = DiscountConfig::load(&conn).unwrap();
    let visible = units::fetch_views(&conn, &cfg, now(), false).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].unit.factory_number, "YAC1");

    let all = units::fetch_views(&conn, &cfg, now(), true).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn revenue_splits_unreserved_units_by_stock_location() {
    let mut conn = db::open_in_memory().unwrap();
    units::replace_all(
        &mut conn,
        &[
            unit("YAC1", "STOCK", "Rojo", "100"),
            unit("YAC2", "stock usados", "Rojo", "50.5"),
            unit("YAC3", "Fabrica", "Rojo", "30"),
            unit("YAC4", "STOCK", "Rojo", "1000"),
        ],
    )
    .unwrap();
    reserved::add(&conn, "YAC4", "Luis").unwrap();

    let rev = units::revenue(&conn).unwrap();
    assert_eq!(rev.in_stock.count, 2);
    assert_eq!(rev.in_stock.total, d("150.5"));
    assert_eq!(rev.not_in_stock.count, 1);
    assert_eq!(rev.not_in_stock.total, d("30"));
    assert_eq!(rev.grand_total, d("180.5"));
    assert_eq!(rev.total_count, 3);
}

#[test]
fn unit_without_factory_number_rolls_back_the_save() {
    let mut conn = db::open_in_memory().unwrap();
    units::replace_all(&mut conn, &[unit("YAC1", "STOCK", "Rojo", "10")]).unwrap();
    let err = units::replace_all(
        &mut conn,
        &[unit("YAC2", "STOCK", "Rojo", "10"), unit("  ", "STOCK", "Rojo", "10")],
    )
    .unwrap_err();
    assert!(err.to_string().contains("factory number"));

    let stored = units::fetch_units(&conn).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].factory_number, "YAC1");
}

#[test]
fn one_load_shares_a_timestamp_and_keeps_file_order() {
    let conn = db::open_in_memory().unwrap();
    let earlier = now();
    let later = now() + chrono::Duration::seconds(5);
    units::insert_units_at(
        &conn,
        &[unit("YAC3", "STOCK", "Rojo", "10"), unit("YAC1", "STOCK", "Rojo", "10")],
        earlier,
    )
    .unwrap();
    units::insert_units_at(
        &conn,
        &[unit("YAC9", "Fabrica", "Rojo", "10"), unit("YAC2", "Fabrica", "Rojo", "10")],
        later,
    )
    .unwrap();

    let stamps: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT DISTINCT loaded_at FROM available_units ORDER BY 1")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    };
    assert_eq!(stamps, vec!["2025-06-15 09:00:00", "2025-06-15 09:00:05"]);

    let order: Vec<String> = units::fetch_units(&conn)
        .unwrap()
        .into_iter()
        .map(|u| u.factory_number)
        .collect();
    assert_eq!(order, vec!["YAC9", "YAC2", "YAC3", "YAC1"]);
}

#[test]
fn replace_all_stamps_every_row_alike() {
    let mut conn = db::open_in_memory().unwrap();
    let batch: Vec<AvailableUnit> = (0..500)
        .map(|i| unit(&format!("YAC{:04}", 500 - i), "STOCK", "Rojo", "10"))
        .collect();
    units::replace_all(&mut conn, &batch).unwrap();
    let distinct: i64 = conn
        .query_row("SELECT COUNT(DISTINCT loaded_at) FROM available_units", [], |r| r.get(0))
        .unwrap();
    assert_eq!(distinct, 1);
    let stored = units::fetch_units(&conn).unwrap();
    assert_eq!(stored[0].factory_number, "YAC0500");
    assert_eq!(stored[499].factory_number, "YAC0001");
}
