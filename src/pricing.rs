// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Discount resolution for vehicle units.
//!
//! A unit's sale price starts from the price stamped at ingestion (the
//! model's base price after its individual discount). On top of that the
//! additional rules are evaluated independently and summed:
//!
//! * stock: the location mentions `STOCK` in any casing;
//! * color: the normalized color has a configured bonus;
//! * age: the estimated delivery is older than the configured threshold.
//!
//! The summed percent is applied once, so rule order never changes the
//! result. The total is not clamped; a sum above 100 yields a negative price.

use anyhow::Result;
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::utils::{dec_col, fmt_pct};

pub const STOCK_CATEGORY: &str = "stock";
pub const STOCK_KEY: &str = "stock_discount";
pub const COLOR_CATEGORY: &str = "color";
pub const AGE_CATEGORY: &str = "age";
pub const AGE_MONTHS_KEY: &str = "months";
pub const AGE_PERCENT_KEY: &str = "discount";
pub const DEFAULT_AGE_MONTHS: u32 = 3;

pub const NO_DISCOUNTS: &str = "No additional discounts";

/// Additional discount settings grouped by category, then key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiscountConfig {
    groups: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl DiscountConfig {
    pub fn from_entries<I, C, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, K, Decimal)>,
        C: Into<String>,
        K: Into<String>,
    {
        let mut cfg = Self::default();
        for (category, key, value) in entries {
            cfg.set(category, key, value);
        }
        cfg
    }

    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare("SELECT category, key, value FROM discount_rules")?;
        let rows = stmt.query_map([], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, dec_col(r, 2)?))
        })?;
        let mut cfg = Self::default();
        for row in rows {
            let (category, key, value) = row?;
            cfg.set(category, key, value);
        }
        Ok(cfg)
    }

    pub fn set(&mut self, category: impl Into<String>, key: impl Into<String>, value: Decimal) {
        self.groups
            .entry(category.into())
            .or_default()
            .insert(key.into(), value);
    }

    pub fn value(&self, category: &str, key: &str) -> Option<Decimal> {
        self.groups.get(category)?.get(key).copied()
    }

    pub fn groups(&self) -> &BTreeMap<String, BTreeMap<String, Decimal>> {
        &self.groups
    }

    pub fn stock_pct(&self) -> Decimal {
        self.value(STOCK_CATEGORY, STOCK_KEY).unwrap_or_default()
    }

    pub fn color_pct(&self, color: &str) -> Decimal {
        self.value(COLOR_CATEGORY, &normalize_color(color))
            .unwrap_or_default()
    }

    pub fn age_months(&self) -> u32 {
        self.value(AGE_CATEGORY, AGE_MONTHS_KEY)
            .and_then(|m| m.trunc().to_u32())
            .unwrap_or(DEFAULT_AGE_MONTHS)
    }

    pub fn age_pct(&self) -> Decimal {
        self.value(AGE_CATEGORY, AGE_PERCENT_KEY)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRule {
    Stock,
    Color,
    Age,
}

impl DiscountRule {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stock => "Stock",
            Self::Color => "Color",
            Self::Age => "Age",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedDiscount {
    pub rule: DiscountRule,
    pub percent: Decimal,
}

impl std::fmt::Display for AppliedDiscount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.rule.label(), fmt_pct(&self.percent))
    }
}

/// The inputs the resolver reads from a unit record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitFacts<'a> {
    pub factory_number: &'a str,
    pub location: Option<&'a str>,
    pub color: Option<&'a str>,
    pub estimated_delivery: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub base_price: Decimal,
    pub applied: Vec<AppliedDiscount>,
    pub total_pct: Decimal,
    pub final_price: Decimal,
}

impl Resolution {
    pub fn breakdown(&self) -> String {
        if self.applied.is_empty() {
            return NO_DISCOUNTS.to_string();
        }
        self.applied
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn resolve(
    unit: &UnitFacts<'_>,
    base_price: Decimal,
    cfg: &DiscountConfig,
    now: NaiveDateTime,
) -> Resolution {
    let mut applied = Vec::new();

    let stock_pct = cfg.stock_pct();
    if stock_pct > Decimal::ZERO && is_stock_location(unit.location.unwrap_or_default()) {
        applied.push(AppliedDiscount {
            rule: DiscountRule::Stock,
            percent: stock_pct,
        });
    }

    if let Some(color) = unit.color {
        let color_pct = cfg.color_pct(color);
        if color_pct > Decimal::ZERO {
            applied.push(AppliedDiscount {
                rule: DiscountRule::Color,
                percent: color_pct,
            });
        }
    }

    if let Some(raw) = unit.estimated_delivery.filter(|s| !s.trim().is_empty()) {
        match parse_delivery_date(raw) {
            Some(delivered) => {
                let age_pct = cfg.age_pct();
                if age_pct > Decimal::ZERO && is_older_than(delivered, now, cfg.age_months()) {
                    applied.push(AppliedDiscount {
                        rule: DiscountRule::Age,
                        percent: age_pct,
                    });
                }
            }
            None => tracing::warn!(
                factory_number = unit.factory_number,
                value = raw,
                "unparseable estimated delivery, age discount skipped"
            ),
        }
    }

    let total_pct: Decimal = applied.iter().map(|a| a.percent).sum();
    if total_pct > Decimal::ONE_HUNDRED {
        tracing::warn!(
            factory_number = unit.factory_number,
            total = %total_pct,
            "additional discounts exceed 100%"
        );
    }
    for a in &applied {
        tracing::debug!(factory_number = unit.factory_number, discount = %a, "discount applied");
    }

    Resolution {
        base_price,
        final_price: apply_discount(base_price, total_pct),
        applied,
        total_pct,
    }
}

/// `base * (1 - pct/100)`.
pub fn apply_discount(base: Decimal, pct: Decimal) -> Decimal {
    base * (Decimal::ONE - pct / Decimal::ONE_HUNDRED)
}

pub fn is_stock_location(location: &str) -> bool {
    location.to_uppercase().contains("STOCK")
}

/// Lookup key for the color table: `" Gris Plata "` -> `gris_plata`.
pub fn normalize_color(color: &str) -> String {
    color.trim().to_lowercase().replace(' ', "_")
}

/// Strict: a delivery exactly `months` ago is not old yet.
fn is_older_than(delivered: NaiveDateTime, now: NaiveDateTime, months: u32) -> bool {
    match now.checked_sub_months(Months::new(months)) {
        Some(limit) => delivered < limit,
        None => false,
    }
}

/// Accepts `2025-01-31`, `Fri, 31 Jan 2025 00:00:00 GMT` (with or without
/// the zone suffix) and ISO/RFC 3339 date-times.
pub fn parse_delivery_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    let without_zone = s.replace("GMT", "");
    let without_zone = without_zone.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(without_zone, "%a, %d %b %Y %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(without_zone) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(without_zone, fmt).ok())
}

/// Individual discount for a unit: the model's future-month percent when
/// the unit dispatches in a month after `today`'s, its current one otherwise.
pub fn select_individual_discount(
    dispatch: NaiveDate,
    today: NaiveDate,
    current: Decimal,
    future: Decimal,
) -> Decimal {
    if (dispatch.year(), dispatch.month()) > (today.year(), today.month()) {
        future
    } else {
        current
    }
}

/// Family tag derived from a model name; first match wins.
pub fn family_for_model(model: &str) -> &'static str {
    let m = model.to_uppercase();
    if m.contains("COROLLA CROSS") {
        "COROLLA CROSS"
    } else if m.contains("COROLLA") {
        "COROLLA"
    } else if m.contains("HILUX") {
        "HILUX"
    } else if m.contains("SW4") {
        "SW4"
    } else if m.contains("YARIS") && m.contains("GR") {
        "YARIS GR"
    } else if m.contains("YARIS") {
        "YARIS"
    } else if m.contains("HIACE") {
        "HIACE"
    } else if m.contains("LAND CRUISER") {
        "LAND CRUISER"
    } else if m.contains("RAV") {
        "RAV 4"
    } else {
        "OTROS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn cfg() -> DiscountConfig {
        DiscountConfig::from_entries([
            (STOCK_CATEGORY, STOCK_KEY, d("5")),
            (COLOR_CATEGORY, "gris_plata", d("3")),
            (AGE_CATEGORY, AGE_MONTHS_KEY, d("3")),
            (AGE_CATEGORY, AGE_PERCENT_KEY, d("2")),
        ])
    }

    #[test]
    fn stock_and_color_example() {
        let unit = UnitFacts {
            factory_number: "YAC1",
            location: Some("Playa STOCK Central"),
            color: Some("Gris Plata"),
            estimated_delivery: Some("2025-06-01"),
        };
        let res = resolve(&unit, d("100000"), &cfg(), now());
        assert_eq!(res.total_pct, d("8"));
        assert_eq!(res.final_price, d("92000"));
        assert_eq!(res.breakdown(), "Stock: 5%, Color: 3%");
    }

    #[test]
    fn stock_matches_any_casing() {
        for loc in ["stock", "En Stock", "STOCK-2", "xxstockyy"] {
            let unit = UnitFacts {
                location: Some(loc),
                ..Default::default()
            };
            let res = resolve(&unit, d("1000"), &cfg(), now());
            assert_eq!(res.total_pct, d("5"), "location {loc}");
        }
        let unit = UnitFacts {
            location: Some("En transito"),
            ..Default::default()
        };
        assert!(resolve(&unit, d("1000"), &cfg(), now()).applied.is_empty());
    }

    #[test]
    fn zero_stock_percent_never_applies() {
        let cfg = DiscountConfig::from_entries([(STOCK_CATEGORY, STOCK_KEY, Decimal::ZERO)]);
        let unit = UnitFacts {
            location: Some("STOCK"),
            ..Default::default()
        };
        let res = resolve(&unit, d("1000"), &cfg, now());
        assert_eq!(res.breakdown(), NO_DISCOUNTS);
        assert_eq!(res.final_price, d("1000"));
    }

    #[test]
    fn color_normalization_is_case_and_padding_insensitive() {
        assert_eq!(normalize_color("Gris Plata"), "gris_plata");
        for c in ["Gris Plata", "  GRIS PLATA ", "gris plata", "gRiS pLaTa"] {
            assert_eq!(cfg().color_pct(c), d("3"), "color {c:?}");
        }
        assert_eq!(cfg().color_pct("Negro Mica"), Decimal::ZERO);
    }

    #[test]
    fn age_boundary_is_strict() {
        // now - 3 months = 2025-03-15 12:00
        let at_limit = UnitFacts {
            estimated_delivery: Some("Sat, 15 Mar 2025 12:00:00 GMT"),
            ..Default::default()
        };
        assert!(resolve(&at_limit, d("1000"), &cfg(), now()).applied.is_empty());

        let before = UnitFacts {
            estimated_delivery: Some("2025-03-15"),
            ..Default::default()
        };
        let res = resolve(&before, d("1000"), &cfg(), now());
        assert_eq!(res.breakdown(), "Age: 2%");
        assert_eq!(res.final_price, d("980"));

        let recent = UnitFacts {
            estimated_delivery: Some("2025-05-01"),
            ..Default::default()
        };
        assert!(resolve(&recent, d("1000"), &cfg(), now()).applied.is_empty());
    }

    #[test]
    fn unparseable_delivery_skips_age_rule() {
        let unit = UnitFacts {
            location: Some("stock"),
            estimated_delivery: Some("pronto"),
            ..Default::default()
        };
        let res = resolve(&unit, d("1000"), &cfg(), now());
        assert_eq!(res.breakdown(), "Stock: 5%");
    }

    #[test]
    fn delivery_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        assert_eq!(parse_delivery_date("2025-01-31"), expected);
        assert_eq!(parse_delivery_date("Fri, 31 Jan 2025 00:00:00 GMT"), expected);
        assert_eq!(parse_delivery_date("Fri, 31 Jan 2025 00:00:00"), expected);
        assert_eq!(parse_delivery_date("2025-01-31T00:00:00"), expected);
        assert_eq!(parse_delivery_date("2025-01-31T00:00:00+00:00"), expected);
        assert_eq!(parse_delivery_date("31 de enero"), None);
    }

    #[test]
    fn total_is_order_independent_and_unclamped() {
        let cfg = DiscountConfig::from_entries([
            (STOCK_CATEGORY, STOCK_KEY, d("60")),
            (COLOR_CATEGORY, "rojo", d("50")),
        ]);
        let unit = UnitFacts {
            location: Some("stock"),
            color: Some("Rojo"),
            ..Default::default()
        };
        let res = resolve(&unit, d("1000"), &cfg, now());
        assert_eq!(res.total_pct, d("110"));
        assert_eq!(res.final_price, d("-100"));
        let sequential = apply_discount(d("1000"), d("50") + d("60"));
        assert_eq!(res.final_price, sequential);
    }

    #[test]
    fn missing_age_months_defaults_to_three() {
        let cfg = DiscountConfig::from_entries([(AGE_CATEGORY, AGE_PERCENT_KEY, d("1"))]);
        assert_eq!(cfg.age_months(), DEFAULT_AGE_MONTHS);
    }

    #[test]
    fn future_discount_only_after_current_month() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let pick = |y, m, dd| {
            select_individual_discount(
                NaiveDate::from_ymd_opt(y, m, dd).unwrap(),
                today,
                d("4"),
                d("7"),
            )
        };
        assert_eq!(pick(2025, 6, 30), d("4"));
        assert_eq!(pick(2025, 5, 1), d("4"));
        assert_eq!(pick(2025, 7, 1), d("7"));
        assert_eq!(pick(2026, 1, 1), d("7"));
    }

    #[test]
    fn families() {
        assert_eq!(family_for_model("COROLLA CROSS XEI HEV 1.8 ECVT"), "COROLLA CROSS");
        assert_eq!(family_for_model("SC - COROLLA 2.0 SEG SAFETY CVT"), "COROLLA");
        assert_eq!(family_for_model("GR YARIS"), "YARIS GR");
        assert_eq!(family_for_model("YARIS XLS 1.5 CVT 5P"), "YARIS");
        assert_eq!(family_for_model("RAV 4 HEV 2.5 AWD Limited CVT"), "RAV 4");
        assert_eq!(family_for_model("GR SUPRA"), "OTROS");
    }
}
