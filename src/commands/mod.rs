// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::{Capability, Module};

pub mod bi;
pub mod discounts;
pub mod doctor;
pub mod exporter;
pub mod ingest;
pub mod observations;
pub mod postponed;
pub mod presale;
pub mod prices;
pub mod reserved;
pub mod units;
pub mod users;

/// Capability a top-level command needs; `None` for ungated commands.
pub fn capability_for(command: &str, sub: Option<&str>) -> Option<Capability> {
    match command {
        "prices" | "discounts" | "ingest" | "postponed" => Some(Capability::Module(Module::Planning)),
        "units" | "reserved" | "presale" | "export" => Some(Capability::Module(Module::Sales)),
        "observations" => Some(Capability::Module(Module::Paperwork)),
        "bi" => Some(Capability::Module(Module::Deliveries)),
        "users" => match sub {
            Some("provision") | Some("login") => None,
            _ => Some(Capability::Admin),
        },
        "doctor" => Some(Capability::Admin),
        _ => None,
    }
}
