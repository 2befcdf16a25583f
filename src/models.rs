// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Factory number shared by every pre-sale placeholder unit.
pub const PRESALE_FACTORY_NUMBER: &str = "YAC999999999";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEntry {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default)]
    pub price_ars: Decimal,
    #[serde(default)]
    pub price_usd: Decimal,
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub future_discount: Decimal,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default)]
    pub family: Option<String>,
}

pub fn default_exchange_rate() -> Decimal {
    Decimal::from(1000)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableUnit {
    pub factory_number: String,
    #[serde(default)]
    pub chassis_number: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub finance_date: Option<String>,
    #[serde(default)]
    pub estimated_dispatch: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    #[serde(default)]
    pub reception_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub stock_days: Option<String>,
    /// Price after the individual discount chosen at ingestion.
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub client_code: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub salesperson: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedUnit {
    pub factory_number: String,
    pub salesperson: String,
    pub added_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostponedUnit {
    pub factory_number: String,
    pub reason: Option<String>,
    pub added_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresaleEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub salesperson: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub informed: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub assigned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDays {
    pub zone: i64,
    pub standard_days: i64,
    pub deviation_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMatrixRow {
    pub class: String,
    pub zone: i64,
    pub codes: String,
    pub is_arrival: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub changes: i64,
    pub regressions: i64,
    pub suspicious: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailPlan {
    pub year: i32,
    pub family: String,
    pub conventional: i64,
    pub special: i64,
    pub savings_plan: i64,
}
