//! Raw source rows and the per-symbol file reader.
//!
//! Each symbol lives in its own delimited text file, read by column position:
//! `date, time, open, high, low, close, volume`. Empty cells are kept as
//! `None` so the gap-fill pass can tell a missing value from a zero.

use crate::config::{ConfigError, SourceFormat};
use crate::domain::{Bar, Symbol};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%d.%m.%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H%M%S", "%H:%M:%S%.f"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// One parsed source row, before alignment and gap filling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl From<&Bar> for RawBar {
    /// Void prices map back to missing cells.
    fn from(bar: &Bar) -> Self {
        let cell = |v: f64| if v.is_nan() { None } else { Some(v) };
        Self {
            timestamp: bar.timestamp,
            open: cell(bar.open),
            high: cell(bar.high),
            low: cell(bar.low),
            close: cell(bar.close),
            volume: Some(bar.volume),
        }
    }
}

/// Errors raised while building a bar store. All are fatal to construction.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source for '{symbol}' not found at {}: {reason}", .path.display())]
    SourceNotFound {
        symbol: Symbol,
        path: PathBuf,
        reason: String,
    },

    #[error("source for '{symbol}' is unparsable at line {line}: {reason}")]
    Unparsable {
        symbol: Symbol,
        line: u64,
        reason: String,
    },

    #[error("no symbols to load")]
    NoSymbols,

    #[error("symbol '{symbol}' listed more than once")]
    DuplicateSymbol { symbol: Symbol },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl LoadError {
    /// The symbol whose source failed, if the error is tied to one.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::SourceNotFound { symbol, .. }
            | Self::Unparsable { symbol, .. }
            | Self::DuplicateSymbol { symbol } => Some(symbol),
            Self::NoSymbols | Self::Config(_) => None,
        }
    }
}

/// Read one symbol's source file into time-ordered raw rows.
///
/// Rows are sorted by timestamp; a repeated timestamp keeps its first row.
pub fn read_symbol_file(
    symbol: &str,
    path: &Path,
    format: &SourceFormat,
) -> Result<Vec<RawBar>, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::SourceNotFound {
        symbol: symbol.to_string(),
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(format.has_headers)
        .delimiter(format.delimiter as u8)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let limit = format.max_rows.unwrap_or(usize::MAX);
    let mut rows = Vec::new();

    for result in reader.records().take(limit) {
        let record = result.map_err(|e| LoadError::Unparsable {
            symbol: symbol.to_string(),
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let raw = parse_record(&record, format).map_err(|reason| LoadError::Unparsable {
            symbol: symbol.to_string(),
            line,
            reason,
        })?;
        rows.push(raw);
    }

    sort_and_dedup(symbol, &mut rows);

    debug!(symbol, rows = rows.len(), path = %path.display(), "read source file");
    Ok(rows)
}

/// Put `rows` in strictly increasing timestamp order.
///
/// The sort is stable, so among rows sharing a timestamp the first one in
/// input order is kept.
pub fn sort_and_dedup(symbol: &str, rows: &mut Vec<RawBar>) {
    rows.sort_by_key(|r| r.timestamp);
    let before = rows.len();
    rows.dedup_by_key(|r| r.timestamp);
    if rows.len() < before {
        warn!(
            symbol,
            dropped = before - rows.len(),
            "duplicate timestamps in source; kept first occurrence"
        );
    }
}

fn parse_record(record: &StringRecord, format: &SourceFormat) -> Result<RawBar, String> {
    if record.len() < 6 {
        return Err(format!(
            "expected at least 6 columns (date, time, open, high, low, close), got {}",
            record.len()
        ));
    }
    let cell = |i: usize| record.get(i).unwrap_or("");

    let timestamp = parse_timestamp(
        cell(0),
        cell(1),
        format.date_format.as_deref(),
        format.time_format.as_deref(),
    )?;

    Ok(RawBar {
        timestamp,
        open: parse_price(cell(2), "open")?,
        high: parse_price(cell(3), "high")?,
        low: parse_price(cell(4), "low")?,
        close: parse_price(cell(5), "close")?,
        volume: parse_volume(cell(6))?,
    })
}

fn parse_price(s: &str, column: &str) -> Result<Option<f64>, String> {
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.parse::<f64>()
        .map(Some)
        .map_err(|e| format!("invalid {column} '{s}': {e}"))
}

fn parse_volume(s: &str) -> Result<Option<u64>, String> {
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(v) = s.parse::<u64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.round() < u64::MAX as f64 => {
            Ok(Some(v.round() as u64))
        }
        Ok(v) if v >= 0.0 => Err(format!("volume {v} out of range")),
        Ok(v) => Err(format!("volume must be non-negative, got {v}")),
        Err(e) => Err(format!("invalid volume '{s}': {e}")),
    }
}

/// Combine the `date` and `time` cells into a single timestamp.
///
/// An empty `time` means midnight, unless the `date` cell already carries a
/// full datetime.
pub fn parse_timestamp(
    date: &str,
    time: &str,
    date_format: Option<&str>,
    time_format: Option<&str>,
) -> Result<NaiveDateTime, String> {
    if time.is_empty() {
        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(date, fmt) {
                return Ok(dt);
            }
        }
    }

    let date = parse_date(date, date_format)?;
    let time = if time.is_empty() {
        NaiveTime::MIN
    } else {
        parse_time(time, time_format)?
    };
    Ok(date.and_time(time))
}

fn parse_date(s: &str, format: Option<&str>) -> Result<NaiveDate, String> {
    if let Some(fmt) = format {
        return NaiveDate::parse_from_str(s, fmt)
            .map_err(|e| format!("date '{s}' does not match '{fmt}': {e}"));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("could not parse date '{s}'"))
}

fn parse_time(s: &str, format: Option<&str>) -> Result<NaiveTime, String> {
    if let Some(fmt) = format {
        return NaiveTime::parse_from_str(s, fmt)
            .map_err(|e| format!("time '{s}' does not match '{fmt}': {e}"));
    }
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("could not parse time '{s}'"))
}
