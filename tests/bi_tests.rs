// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use dealerdesk::commands::bi::{self, BiDashboard, DeliverySource, RegistrationKind, SalesChannel};
use dealerdesk::{cli, db};
use rust_decimal::Decimal;
use std::io::Write;
use std::time::Duration;
use tempfile::{Builder, NamedTempFile};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn csv_file(body: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    write!(file, "{}", body).unwrap();
    file.flush().unwrap();
    file
}

/// One row of the conventional delivery report (21 columns).
fn delivery_line(note: &str, date: &str, model: &str, factory: &str) -> String {
    let mut cols = vec![""; 21];
    cols[0] = "x";
    cols[15] = note;
    cols[16] = date;
    cols[19] = model;
    cols[20] = factory;
    cols.join(",")
}

fn deliveries_csv() -> NamedTempFile {
    let mut body = String::from("Reporte de entregas,\n");
    for line in [
        delivery_line("R-0001-123", "15/03/2025", "HILUX SR", "YAC1"),
        delivery_line("R-0004-9", "2025-02-01", "COROLLA XEI", "F01X"),
        delivery_line("X-1", "2025-02-01", "HILUX SR", "YAC3"),
        delivery_line("R-0009-1", "2025-07-01", "HILUX DX", "YAC2"),
    ] {
        body.push_str(&line);
        body.push('\n');
    }
    csv_file(&body)
}

#[test]
fn brand_share_from_wide_registrations() {
    let mut conn = db::open_in_memory().unwrap();
    let file = csv_file(
        "Marca,2025-01,02/2025,Total\nToyota,100,\"1.200\",1300\nFord,50,30,80\nTotal,150,1230,1380\n",
    );
    let path = file.path().to_str().unwrap().to_string();

    let matches = cli::build_cli().get_matches_from([
        "dealerdesk",
        "bi",
        "import-registrations",
        "--kind",
        "marca",
        "--location",
        "Mendoza",
        "--path",
        &path,
    ]);
    if let Some(("bi", bi_m)) = matches.subcommand() {
        bi::handle(&mut conn, bi_m, Duration::from_secs(60), Some("ana")).unwrap();
    } else {
        panic!("no bi subcommand");
    }

    let mut dash = BiDashboard::new(Duration::from_secs(60));
    let shares = dash.share(&conn, "2025-02", None).unwrap();
    assert_eq!(shares.len(), 2);
    assert_eq!(shares[0].brand, "Toyota");
    assert_eq!(shares[0].quantity, 1200);
    assert_eq!(shares[0].share_pct, d("97.56"));
    assert_eq!(shares[1].share_pct, d("2.44"));

    assert!(dash.share(&conn, "2025-03", Some("Mendoza")).unwrap().is_empty());

    let uploads = bi::uploads(&conn).unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].kind, "brand");
    assert_eq!(uploads[0].rows, 4);
    assert_eq!(uploads[0].username.as_deref(), Some("ana"));
}

#[test]
fn cached_share_survives_until_an_import() {
    let mut conn = db::open_in_memory().unwrap();
    let mut dash = BiDashboard::new(Duration::from_secs(300));
    let first = csv_file("Marca,2025-01\nToyota,10\n");
    dash.import_registrations(&mut conn, RegistrationKind::Brand, "Mendoza", first.path(), None)
        .unwrap();
    assert_eq!(dash.share(&conn, "2025-01", None).unwrap()[0].quantity, 10);
    assert_eq!(dash.cached_entries(), 1);

    conn.execute("UPDATE bi_registrations SET quantity=99", []).unwrap();
    assert_eq!(dash.share(&conn, "2025-01", None).unwrap()[0].quantity, 10);

    let second = csv_file("Marca,2025-01\nToyota,20\n");
    dash.import_registrations(&mut conn, RegistrationKind::Brand, "San Juan", second.path(), None)
        .unwrap();
    assert_eq!(dash.cached_entries(), 0);
    assert_eq!(dash.share(&conn, "2025-01", None).unwrap()[0].quantity, 119);
}

#[test]
fn reimporting_a_period_overwrites_figures() {
    let mut conn = db::open_in_memory().unwrap();
    let mut dash = BiDashboard::new(Duration::ZERO);
    let a = csv_file("Marca;2025-01\nToyota;10\n");
    let b = csv_file("Marca;2025-01\nToyota;12\n");
    dash.import_registrations(&mut conn, RegistrationKind::Brand, "Mendoza", a.path(), None)
        .unwrap();
    dash.import_registrations(&mut conn, RegistrationKind::Brand, "Mendoza", b.path(), None)
        .unwrap();
    assert_eq!(dash.share(&conn, "2025-01", None).unwrap()[0].quantity, 12);
}

#[test]
fn deliveries_are_classified_and_deduplicated() {
    let mut conn = db::open_in_memory().unwrap();
    let mut dash = BiDashboard::new(Duration::ZERO);
    let file = deliveries_csv();
    let parsed = dash
        .import_deliveries(&mut conn, DeliverySource::Conventional, file.path(), None)
        .unwrap();
    assert_eq!(parsed.deliveries.len(), 3);
    assert_eq!(parsed.skipped, 1);
    assert_eq!(parsed.deliveries[0].branch, "Casa Central");
    assert_eq!(parsed.deliveries[1].channel, SalesChannel::Special);
    assert_eq!(parsed.deliveries[1].branch, "Bombal");
    assert_eq!(parsed.deliveries[2].branch, bi::UNCLASSIFIED_BRANCH);

    dash.import_deliveries(&mut conn, DeliverySource::Conventional, file.path(), None)
        .unwrap();
    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM bi_deliveries", [], |r| r.get(0))
        .unwrap();
    assert_eq!(stored, 3);
}

#[test]
fn plan_report_prorates_objectives_year_to_date() {
    let mut conn = db::open_in_memory().unwrap();
    let matches = cli::build_cli().get_matches_from([
        "dealerdesk", "bi", "plan", "set", "2025", "hilux", "12", "0", "6",
    ]);
    if let Some(("bi", bi_m)) = matches.subcommand() {
        bi::handle(&mut conn, bi_m, Duration::ZERO, None).unwrap();
    } else {
        panic!("no bi subcommand");
    }
    let plan = bi::plan_for_year(&conn, 2025).unwrap();
    assert_eq!(plan[0].family, "HILUX");

    let mut dash = BiDashboard::new(Duration::ZERO);
    let file = deliveries_csv();
    dash.import_deliveries(&mut conn, DeliverySource::Conventional, file.path(), None)
        .unwrap();

    let march = dash.plan_report(&conn, 2025, Some(3)).unwrap();
    let keys: Vec<_> = march.iter().map(|l| (l.family.as_str(), l.channel)).collect();
    assert_eq!(
        keys,
        vec![
            ("COROLLA", SalesChannel::Special),
            ("HILUX", SalesChannel::Conventional),
            ("HILUX", SalesChannel::Special),
            ("HILUX", SalesChannel::SavingsPlan),
        ]
    );
    assert_eq!(march[0].achieved_pct, None);
    assert_eq!(march[1].objective, d("3"));
    assert_eq!(march[1].delivered, 1);
    assert_eq!(march[1].achieved_pct, Some(d("33.33")));
    assert_eq!(march[3].objective, d("1.5"));
    assert_eq!(march[3].achieved_pct, Some(Decimal::ZERO));

    let year = dash.plan_report(&conn, 2025, None).unwrap();
    assert_eq!(year[1].objective, d("12"));
    assert_eq!(year[1].delivered, 2);
    assert_eq!(year[1].achieved_pct, Some(d("16.67")));

    assert!(dash.plan_report(&conn, 2025, Some(13)).is_err());
}

#[test]
fn unknown_delivery_source_is_rejected() {
    assert!(DeliverySource::parse("fleet").is_err());
    assert!(RegistrationKind::parse("dealer").is_err());
    assert!(bi::parse_registrations(&[]).is_err());
}
