// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use dealerdesk::commands::{postponed, reserved};
use dealerdesk::error::{DeskError, exit_code_for};
use dealerdesk::{cli, db};

#[test]
fn reserve_list_and_release_through_cli() {
    let conn = db::open_in_memory().unwrap();
    let matches = cli::build_cli().get_matches_from([
        "dealerdesk",
        "reserved",
        "add",
        " YAC123 ",
        "Carla Gomez",
    ]);
    if let Some(("reserved", reserved_m)) = matches.subcommand() {
        reserved::handle(&conn, reserved_m).unwrap();
    } else {
        panic!("no reserved subcommand");
    }

    let items = reserved::list(&conn).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].factory_number, "YAC123");
    assert_eq!(items[0].salesperson, "Carla Gomez");

    let matches =
        cli::build_cli().get_matches_from(["dealerdesk", "reserved", "rm", "YAC123"]);
    if let Some(("reserved", reserved_m)) = matches.subcommand() {
        reserved::handle(&conn, reserved_m).unwrap();
    }
    assert!(reserved::list(&conn).unwrap().is_empty());
}

#[test]
fn double_reservation_is_a_conflict() {
    let conn = db::open_in_memory().unwrap();
    reserved::add(&conn, "YAC1", "Ana").unwrap();
    let err = reserved::add(&conn, "YAC1", "Beto").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DeskError>(),
        Some(DeskError::Conflict(_))
    ));
    assert_eq!(exit_code_for(&err), 2);
    assert_eq!(reserved::list(&conn).unwrap()[0].salesperson, "Ana");
}

#[test]
fn blank_salesperson_is_rejected() {
    let conn = db::open_in_memory().unwrap();
    let err = reserved::add(&conn, "YAC1", "   ").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DeskError>(),
        Some(DeskError::Validation(_))
    ));
}

#[test]
fn releasing_an_unknown_reservation_is_not_found() {
    let conn = db::open_in_memory().unwrap();
    let err = reserved::remove(&conn, "YAC404").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DeskError>(),
        Some(DeskError::NotFound(_))
    ));
}

#[test]
fn postponed_units_keep_their_reason_and_feed_the_skip_set() {
    let conn = db::open_in_memory().unwrap();
    let matches = cli::build_cli().get_matches_from([
        "dealerdesk",
        "postponed",
        "add",
        "TPA77",
        "--reason",
        "client asked to wait",
    ]);
    if let Some(("postponed", postponed_m)) = matches.subcommand() {
        postponed::handle(&conn, postponed_m).unwrap();
    } else {
        panic!("no postponed subcommand");
    }
    postponed::add(&conn, "YAC9", None).unwrap();

    let items = postponed::list(&conn).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].factory_number, "YAC9");
    assert_eq!(items[1].reason.as_deref(), Some("client asked to wait"));

    let skip = postponed::postponed_set(&conn).unwrap();
    assert!(skip.contains("TPA77"));
    assert!(skip.contains("YAC9"));

    let err = postponed::add(&conn, "TPA77", None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DeskError>(),
        Some(DeskError::Conflict(_))
    ));

    postponed::remove(&conn, "TPA77").unwrap();
    assert_eq!(postponed::list(&conn).unwrap().len(), 1);
}
