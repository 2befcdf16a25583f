// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Registration statistics, delivery tracking and the retail plan.

use crate::error::DeskError;
use crate::models::RetailPlan;
use crate::pricing::family_for_model;
use crate::sheet::{Cell, read_rows};
use crate::utils::{maybe_print_json, optional_arg, parse_month, pretty_table, required_arg};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::path::Path;
use std::time::{Duration, Instant};

static BRANCH_CODE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"R-(\d{4})-").ok());

pub const UNCLASSIFIED_BRANCH: &str = "Sin clasificar";

/// Entries expire `ttl` after they were stored.
#[derive(Debug)]
pub struct BiCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> BiCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some((expires, v)) if Instant::now() < *expires => Some(v.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: K, value: V) {
        let expires = Instant::now() + self.ttl;
        self.entries.insert(key, (expires, value));
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Brand,
    Model,
}

impl RegistrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Model => "model",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "brand" | "marca" => Ok(Self::Brand),
            "model" | "modelo" => Ok(Self::Model),
            other => Err(DeskError::validation(format!(
                "Invalid registration kind '{}' (use brand|model)",
                other
            ))
            .into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub name: String,
    pub period: String,
    pub quantity: i64,
}

/// Which delivery report a file came from; decides the column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverySource {
    Conventional,
    SavingsPlan,
}

impl DeliverySource {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "conventional" => Ok(Self::Conventional),
            "savings-plan" | "savings_plan" => Ok(Self::SavingsPlan),
            other => Err(DeskError::validation(format!(
                "Invalid delivery source '{}' (use conventional|savings-plan)",
                other
            ))
            .into()),
        }
    }

    /// (delivery note, date, model, factory number) column indexes.
    fn columns(self) -> (usize, usize, usize, usize) {
        match self {
            Self::Conventional => (15, 16, 19, 20),
            Self::SavingsPlan => (10, 11, 13, 14),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Conventional => "deliveries-conventional",
            Self::SavingsPlan => "deliveries-savings-plan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesChannel {
    Conventional,
    Special,
    SavingsPlan,
    Other,
}

impl SalesChannel {
    pub fn from_factory_number(factory_number: &str) -> Self {
        if factory_number.starts_with("YAC") {
            Self::Conventional
        } else if factory_number.starts_with("TPA") || factory_number.starts_with("TAP") {
            Self::SavingsPlan
        } else if factory_number.starts_with("F01") || factory_number.starts_with("F02") {
            Self::Special
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conventional => "conventional",
            Self::Special => "special",
            Self::SavingsPlan => "savings_plan",
            Self::Other => "other",
        }
    }

    fn from_stored(s: &str) -> Self {
        match s {
            "conventional" => Self::Conventional,
            "special" => Self::Special,
            "savings_plan" => Self::SavingsPlan,
            _ => Self::Other,
        }
    }
}

/// Branch from the code in `R-<code>-<number>`; savings plan notes use their own codes.
pub fn branch_for(delivery_note: &str, channel: SalesChannel) -> &'static str {
    let code = BRANCH_CODE
        .as_ref()
        .and_then(|re| re.captures(delivery_note))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    match (channel, code) {
        (_, None) => UNCLASSIFIED_BRANCH,
        (SalesChannel::SavingsPlan, Some("0021")) => "Casa Central",
        (SalesChannel::SavingsPlan, Some("0022" | "0002")) => "San Rafael",
        (SalesChannel::SavingsPlan, Some(_)) => UNCLASSIFIED_BRANCH,
        (_, Some("0001")) => "Casa Central",
        (_, Some("0002")) => "San Rafael",
        (_, Some("0004")) => "Bombal",
        (_, Some(_)) => UNCLASSIFIED_BRANCH,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub delivery_note: String,
    pub delivered_on: NaiveDate,
    pub model: String,
    pub factory_number: String,
    pub channel: SalesChannel,
    pub branch: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryParse {
    pub deliveries: Vec<Delivery>,
    pub skipped: usize,
}

/// Keep rows with an `R-` note, a readable date and a factory number.
pub fn parse_deliveries(rows: &[Vec<Cell>], source: DeliverySource) -> DeliveryParse {
    let (note_col, date_col, model_col, factory_col) = source.columns();
    let mut out = DeliveryParse::default();
    for row in rows.iter().skip(1) {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let text = |idx: usize| row.get(idx).and_then(Cell::text).unwrap_or_default();
        let note = text(note_col);
        let factory = text(factory_col);
        let date = row.get(date_col).and_then(Cell::date);
        let (Some(delivered_on), true, true) = (date, note.starts_with("R-"), !factory.is_empty())
        else {
            out.skipped += 1;
            continue;
        };
        let channel = SalesChannel::from_factory_number(&factory);
        out.deliveries.push(Delivery {
            branch: branch_for(&note, channel).to_string(),
            delivery_note: note,
            delivered_on,
            model: text(model_col),
            factory_number: factory,
            channel,
        });
    }
    out
}

/// Wide registration sheet: names down the first column, one `YYYY-MM`
/// period per remaining header cell.
pub fn parse_registrations(rows: &[Vec<Cell>]) -> Result<Vec<Registration>> {
    let mut rows = rows.iter().filter(|r| r.iter().any(|c| !c.is_empty()));
    let header = rows
        .next()
        .ok_or_else(|| DeskError::validation("Registration file is empty"))?;
    let mut periods = Vec::new();
    for (idx, cell) in header.iter().enumerate().skip(1) {
        let Some(raw) = cell.text() else { continue };
        if raw.eq_ignore_ascii_case("total") {
            continue;
        }
        periods.push((idx, normalize_period(&raw)?));
    }
    if periods.is_empty() {
        return Err(DeskError::validation("Registration header has no periods").into());
    }

    let mut out = Vec::new();
    for row in rows {
        let Some(name) = row.first().and_then(Cell::text) else { continue };
        if name.eq_ignore_ascii_case("total") {
            continue;
        }
        for (idx, period) in &periods {
            let Some(raw) = row.get(*idx).and_then(Cell::text) else { continue };
            let quantity = parse_quantity(&raw).ok_or_else(|| {
                DeskError::validation(format!(
                    "Invalid quantity '{}' for {} in {}",
                    raw, name, period
                ))
            })?;
            out.push(Registration {
                name: name.clone(),
                period: period.clone(),
                quantity,
            });
        }
    }
    Ok(out)
}

/// `YYYY-MM`, also accepting `MM/YYYY` and `YYYY/MM` headers.
fn normalize_period(raw: &str) -> Result<String> {
    let s = raw.trim();
    let candidate = match s.split_once('/') {
        Some((a, b)) if a.len() == 4 => format!("{}-{:0>2}", a, b),
        Some((a, b)) => format!("{}-{:0>2}", b, a),
        None => s.to_string(),
    };
    parse_month(&candidate)
        .map_err(|_| DeskError::validation(format!("Invalid period header '{}'", raw)).into())
}

/// Whole units; thousands separators are ignored.
fn parse_quantity(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '.' | ',' | ' ')).collect();
    cleaned.parse().ok()
}

pub fn store_registrations(
    conn: &mut Connection,
    kind: RegistrationKind,
    location: &str,
    regs: &[Registration],
) -> Result<usize> {
    let location = location.trim();
    if location.is_empty() {
        return Err(DeskError::validation("Location must not be empty").into());
    }
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO bi_registrations(kind, location, name, period, quantity)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(kind, location, name, period) DO UPDATE SET
                quantity=excluded.quantity, loaded_at=datetime('now')",
        )?;
        for r in regs {
            stmt.execute(params![kind.as_str(), location, r.name, r.period, r.quantity])?;
        }
    }
    tx.commit()?;
    Ok(regs.len())
}

pub fn store_deliveries(conn: &mut Connection, deliveries: &[Delivery]) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO bi_deliveries(delivery_note, delivered_on, model, factory_number, channel, branch)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(delivery_note, factory_number) DO UPDATE SET
                delivered_on=excluded.delivered_on,
                model=excluded.model,
                channel=excluded.channel,
                branch=excluded.branch,
                loaded_at=datetime('now')",
        )?;
        for d in deliveries {
            stmt.execute(params![
                d.delivery_note,
                d.delivered_on.format("%Y-%m-%d").to_string(),
                d.model,
                d.factory_number,
                d.channel.as_str(),
                d.branch
            ])?;
        }
    }
    tx.commit()?;
    Ok(deliveries.len())
}

pub fn record_upload(
    conn: &Connection,
    file_name: &str,
    kind: &str,
    rows: usize,
    username: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO bi_uploads(file_name, kind, rows, username) VALUES (?1,?2,?3,?4)",
        params![file_name, kind, rows as i64, username],
    )?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct Upload {
    pub file_name: String,
    pub kind: String,
    pub rows: i64,
    pub username: Option<String>,
    pub loaded_at: String,
}

pub fn uploads(conn: &Connection) -> Result<Vec<Upload>> {
    let mut stmt = conn.prepare(
        "SELECT file_name, kind, rows, username, loaded_at FROM bi_uploads
         ORDER BY loaded_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Upload {
            file_name: r.get(0)?,
            kind: r.get(1)?,
            rows: r.get(2)?,
            username: r.get(3)?,
            loaded_at: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn set_plan(conn: &Connection, plan: &RetailPlan) -> Result<()> {
    let family = plan.family.trim().to_uppercase();
    if family.is_empty() {
        return Err(DeskError::validation("Family must not be empty").into());
    }
    if plan.conventional < 0 || plan.special < 0 || plan.savings_plan < 0 {
        return Err(DeskError::validation("Plan objectives must not be negative").into());
    }
    conn.execute(
        "INSERT INTO retail_plan(year, family, conventional, special, savings_plan)
         VALUES (?1,?2,?3,?4,?5)
         ON CONFLICT(year, family) DO UPDATE SET
            conventional=excluded.conventional,
            special=excluded.special,
            savings_plan=excluded.savings_plan,
            updated_at=datetime('now')",
        params![plan.year, family, plan.conventional, plan.special, plan.savings_plan],
    )?;
    Ok(())
}

pub fn plan_for_year(conn: &Connection, year: i32) -> Result<Vec<RetailPlan>> {
    let mut stmt = conn.prepare(
        "SELECT year, family, conventional, special, savings_plan FROM retail_plan
         WHERE year=?1 ORDER BY family",
    )?;
    let rows = stmt.query_map(params![year], |r| {
        Ok(RetailPlan {
            year: r.get(0)?,
            family: r.get(1)?,
            conventional: r.get(2)?,
            special: r.get(3)?,
            savings_plan: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandShare {
    pub brand: String,
    pub quantity: i64,
    pub share_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanLine {
    pub family: String,
    pub channel: SalesChannel,
    pub objective: Decimal,
    pub delivered: i64,
    /// `None` when there is no objective to compare against.
    pub achieved_pct: Option<Decimal>,
}

type ShareKey = (String, Option<String>);
type PlanKey = (i32, Option<u32>);

/// Report queries with a short-lived cache; imports invalidate it.
///
/// The cache only serves hits while one dashboard lives across calls. Each CLI
/// invocation builds a fresh one, so `DEALERDESK_BI_CACHE_TTL_SECS` matters to
/// long-lived embedders, not to separate `dealerdesk bi` runs.
pub struct BiDashboard {
    shares: BiCache<ShareKey, Vec<BrandShare>>,
    plans: BiCache<PlanKey, Vec<PlanLine>>,
}

impl BiDashboard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            shares: BiCache::new(ttl),
            plans: BiCache::new(ttl),
        }
    }

    pub fn invalidate(&mut self) {
        self.shares.invalidate();
        self.plans.invalidate();
        tracing::debug!("bi cache invalidated");
    }

    pub fn cached_entries(&self) -> usize {
        self.shares.len() + self.plans.len()
    }

    pub fn import_registrations(
        &mut self,
        conn: &mut Connection,
        kind: RegistrationKind,
        location: &str,
        path: &Path,
        username: Option<&str>,
    ) -> Result<usize> {
        let rows = read_rows(path)?;
        let regs = parse_registrations(&rows)
            .with_context(|| format!("Reading registrations from {}", path.display()))?;
        let n = store_registrations(conn, kind, location, &regs)?;
        record_upload(conn, &file_label(path), kind.as_str(), n, username)?;
        self.invalidate();
        tracing::info!(kind = kind.as_str(), location, rows = n, "registrations imported");
        Ok(n)
    }

    pub fn import_deliveries(
        &mut self,
        conn: &mut Connection,
        source: DeliverySource,
        path: &Path,
        username: Option<&str>,
    ) -> Result<DeliveryParse> {
        let rows = read_rows(path)?;
        let parsed = parse_deliveries(&rows, source);
        store_deliveries(conn, &parsed.deliveries)?;
        record_upload(
            conn,
            &file_label(path),
            source.as_str(),
            parsed.deliveries.len(),
            username,
        )?;
        self.invalidate();
        tracing::info!(
            source = source.as_str(),
            rows = parsed.deliveries.len(),
            skipped = parsed.skipped,
            "deliveries imported"
        );
        Ok(parsed)
    }

    /// Brand share of registrations in `period`, across every location unless one is named.
    pub fn share(
        &mut self,
        conn: &Connection,
        period: &str,
        location: Option<&str>,
    ) -> Result<Vec<BrandShare>> {
        let period = parse_month(period.trim())?;
        let key = (period.clone(), location.map(str::to_string));
        if let Some(hit) = self.shares.get(&key) {
            return Ok(hit);
        }
        let mut stmt = conn.prepare(
            "SELECT name, SUM(quantity) FROM bi_registrations
             WHERE kind='brand' AND period=?1 AND (?2 IS NULL OR location=?2)
             GROUP BY name ORDER BY SUM(quantity) DESC, name",
        )?;
        let rows = stmt.query_map(params![period, location], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        let total: i64 = counts.iter().map(|(_, q)| q).sum();
        let out: Vec<BrandShare> = counts
            .into_iter()
            .map(|(brand, quantity)| BrandShare {
                share_pct: percent_of(quantity, Decimal::from(total)).unwrap_or_default(),
                brand,
                quantity,
            })
            .collect();
        self.shares.set(key, out.clone());
        Ok(out)
    }

    /// Objective vs. delivered units per family and channel. With `month`,
    /// deliveries up to that month are compared against the prorated objective.
    pub fn plan_report(
        &mut self,
        conn: &Connection,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<PlanLine>> {
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return Err(DeskError::validation(format!("Invalid month {}", m)).into());
            }
        }
        let key = (year, month);
        if let Some(hit) = self.plans.get(&key) {
            return Ok(hit);
        }

        let factor = match month {
            Some(m) => Decimal::from(m) / Decimal::from(12),
            None => Decimal::ONE,
        };
        let mut objectives: BTreeMap<(String, SalesChannel), Decimal> = BTreeMap::new();
        for p in plan_for_year(conn, year)? {
            for (channel, target) in [
                (SalesChannel::Conventional, p.conventional),
                (SalesChannel::Special, p.special),
                (SalesChannel::SavingsPlan, p.savings_plan),
            ] {
                objectives.insert(
                    (p.family.clone(), channel),
                    (Decimal::from(target) * factor).round_dp(1),
                );
            }
        }

        let last_day = match month {
            Some(m) => format!("{:04}-{:02}-31", year, m),
            None => format!("{:04}-12-31", year),
        };
        let mut stmt = conn.prepare(
            "SELECT model, channel FROM bi_deliveries
             WHERE delivered_on >= ?1 AND delivered_on <= ?2",
        )?;
        let rows = stmt.query_map(params![format!("{:04}-01-01", year), last_day], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        let mut delivered: BTreeMap<(String, SalesChannel), i64> = BTreeMap::new();
        for row in rows {
            let (model, channel) = row?;
            let channel = SalesChannel::from_stored(&channel);
            if channel == SalesChannel::Other {
                continue;
            }
            *delivered
                .entry((family_for_model(&model).to_string(), channel))
                .or_default() += 1;
        }

        let mut keys: Vec<(String, SalesChannel)> =
            objectives.keys().chain(delivered.keys()).cloned().collect();
        keys.sort();
        keys.dedup();
        let out: Vec<PlanLine> = keys
            .into_iter()
            .map(|key| {
                let objective = objectives.get(&key).copied().unwrap_or_default();
                let count = delivered.get(&key).copied().unwrap_or_default();
                PlanLine {
                    achieved_pct: percent_of(count, objective),
                    family: key.0,
                    channel: key.1,
                    objective,
                    delivered: count,
                }
            })
            .collect();
        self.plans.set(key, out.clone());
        Ok(out)
    }
}

fn percent_of(part: i64, whole: Decimal) -> Option<Decimal> {
    if whole <= Decimal::ZERO {
        return None;
    }
    Some((Decimal::from(part) * Decimal::ONE_HUNDRED / whole).round_dp(2))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn handle(
    conn: &mut Connection,
    m: &clap::ArgMatches,
    cache_ttl: Duration,
    actor: Option<&str>,
) -> Result<()> {
    let mut dash = BiDashboard::new(cache_ttl);
    match m.subcommand() {
        Some(("import-registrations", sub)) => {
            let kind = RegistrationKind::parse(required_arg(sub, "kind")?)?;
            let location = required_arg(sub, "location")?;
            let path = required_arg(sub, "path")?;
            let n = dash.import_registrations(conn, kind, location, Path::new(path), actor)?;
            println!("Imported {} {} registration figures for {}", n, kind.as_str(), location);
        }
        Some(("import-deliveries", sub)) => {
            let source = DeliverySource::parse(required_arg(sub, "source")?)?;
            let path = required_arg(sub, "path")?;
            let parsed = dash.import_deliveries(conn, source, Path::new(path), actor)?;
            let unclassified = parsed
                .deliveries
                .iter()
                .filter(|d| d.branch == UNCLASSIFIED_BRANCH)
                .count();
            println!(
                "Imported {} deliveries ({} rows skipped, {} without branch)",
                parsed.deliveries.len(),
                parsed.skipped,
                unclassified
            );
        }
        Some(("plan", sub)) => match sub.subcommand() {
            Some(("set", s)) => {
                let arg = |name: &str| -> Result<i64> {
                    s.get_one::<i64>(name)
                        .copied()
                        .with_context(|| format!("{} required", name))
                };
                let plan = RetailPlan {
                    year: *s.get_one::<i32>("year").context("year required")?,
                    family: required_arg(s, "family")?.to_string(),
                    conventional: arg("conventional")?,
                    special: arg("special")?,
                    savings_plan: arg("savings_plan")?,
                };
                set_plan(conn, &plan)?;
                println!("Saved {} plan for {}", plan.year, plan.family.to_uppercase());
            }
            Some(("list", s)) => {
                let year = *s.get_one::<i32>("year").context("year required")?;
                let plan = plan_for_year(conn, year)?;
                if maybe_print_json(s.get_flag("json"), s.get_flag("jsonl"), &plan)? {
                    return Ok(());
                }
                let data = plan
                    .into_iter()
                    .map(|p| {
                        vec![
                            p.family,
                            p.conventional.to_string(),
                            p.special.to_string(),
                            p.savings_plan.to_string(),
                            (p.conventional + p.special + p.savings_plan).to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["Family", "Conventional", "Special", "Savings plan", "Total"],
                        data
                    )
                );
            }
            _ => {}
        },
        Some(("share", sub)) => {
            let period = required_arg(sub, "period")?;
            let location = optional_arg(sub, "location");
            let shares = dash.share(conn, period, location.as_deref())?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &shares)? {
                return Ok(());
            }
            let data = shares
                .into_iter()
                .map(|s| {
                    vec![
                        s.brand,
                        s.quantity.to_string(),
                        format!("{}%", s.share_pct.normalize()),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Brand", "Registrations", "Share"], data));
        }
        Some(("plan-report", sub)) => {
            let year = *sub.get_one::<i32>("year").context("year required")?;
            let month = sub.get_one::<u32>("month").copied();
            let lines = dash.plan_report(conn, year, month)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &lines)? {
                return Ok(());
            }
            let data = lines
                .into_iter()
                .map(|l| {
                    vec![
                        l.family,
                        l.channel.as_str().to_string(),
                        l.objective.normalize().to_string(),
                        l.delivered.to_string(),
                        l.achieved_pct
                            .map(|p| format!("{}%", p.normalize()))
                            .unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Family", "Channel", "Objective", "Delivered", "Achieved"], data)
            );
        }
        Some(("uploads", sub)) => {
            let items = uploads(conn)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
                return Ok(());
            }
            let data = items
                .into_iter()
                .map(|u| {
                    vec![
                        u.loaded_at,
                        u.kind,
                        u.file_name,
                        u.rows.to_string(),
                        u.username.unwrap_or_default(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Loaded", "Kind", "File", "Rows", "User"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
