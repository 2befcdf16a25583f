// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Uniform row access to uploaded spreadsheets (`.xlsx`, `.xls`) and CSV.

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use std::path::Path;

use crate::error::DeskError;
use crate::utils::{excel_serial_to_date, parse_flexible_date};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Trimmed text; integral numbers print without a fraction.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
        }
    }

    /// Serial numbers are spreadsheet dates; text goes through the flexible parser.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Empty => None,
            Self::Number(n) => excel_serial_to_date(*n),
            Self::Text(s) => parse_flexible_date(s),
        }
    }
}

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

pub fn detect_format(path: &Path) -> Result<SheetFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xls" => Ok(SheetFormat::Workbook),
        "csv" => Ok(SheetFormat::Csv),
        _ => Err(DeskError::validation(format!(
            "Unsupported file type '{}': use .xlsx, .xls or .csv",
            path.display()
        ))
        .into()),
    }
}

/// All rows of the first sheet (or the CSV), header rows included.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<Cell>>> {
    match detect_format(path)? {
        SheetFormat::Workbook => read_workbook(path),
        SheetFormat::Csv => {
            let bytes =
                std::fs::read(path).with_context(|| format!("Open CSV {}", path.display()))?;
            read_csv_text(&decode_text(&bytes))
        }
    }
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut wb = open_workbook_auto(path)
        .with_context(|| format!("Open workbook {}", path.display()))?;
    let range = wb
        .worksheet_range_at(0)
        .with_context(|| format!("Workbook {} has no sheets", path.display()))?
        .with_context(|| format!("Read first sheet of {}", path.display()))?;
    let rows = range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect::<Vec<Vec<Cell>>>();
    tracing::debug!(path = %path.display(), rows = rows.len(), "workbook read");
    Ok(rows)
}

pub fn read_csv_text(text: &str) -> Result<Vec<Vec<Cell>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        rows.push(
            rec.iter()
                .map(|f| {
                    if f.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(f.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// `;` for exports from Spanish-locale spreadsheets, `,` otherwise.
pub fn sniff_delimiter(text: &str) -> u8 {
    let first = text.lines().next().unwrap_or_default();
    if first.matches(';').count() > first.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// UTF-8 (BOM stripped) when valid, else Windows-1252.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            tracing::debug!("input is not UTF-8, decoding as Windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}
