//! Multi-symbol time alignment and gap filling.
//!
//! Given raw rows for multiple symbols, put them on a common timeline and
//! fill the holes: volume gaps become 0, OHLC gaps carry the last observed
//! value forward. Rows before a symbol's first observation have nothing to
//! carry and stay void (NaN prices).

use super::source::{sort_and_dedup, RawBar};
use crate::domain::{Bar, Symbol};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How per-symbol tables relate to the union of all timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Reindex every symbol onto the union of all timestamps, then fill.
    /// All tables end up with identical length and index.
    #[default]
    Union,
    /// Keep each symbol on its own index and only fill gaps within it.
    /// The union is still computed and reported, but not applied.
    PerSymbol,
}

/// Bar data for multiple symbols after alignment and gap filling.
#[derive(Debug)]
pub struct AlignedData {
    /// Union of every symbol's timestamps (sorted ascending).
    pub timestamps: Vec<NaiveDateTime>,
    /// Filled bars per symbol. Under [`Alignment::Union`] each inner Vec has
    /// the same length as `timestamps`.
    pub bars: HashMap<Symbol, Vec<Bar>>,
    /// Symbols in the order they were requested.
    pub symbols: Vec<Symbol>,
}

/// Align the listed symbols and fill their gaps.
///
/// Symbols without an entry in `symbol_rows` get an empty source table.
/// Rows may arrive in any order; each table is sorted and deduplicated
/// (first row per timestamp wins) before anything else.
pub fn align_symbols(
    mut symbol_rows: HashMap<Symbol, Vec<RawBar>>,
    symbols: &[Symbol],
    alignment: Alignment,
) -> AlignedData {
    let mut all_timestamps = BTreeSet::new();
    for symbol in symbols {
        if let Some(rows) = symbol_rows.get_mut(symbol) {
            sort_and_dedup(symbol, rows);
            all_timestamps.extend(rows.iter().map(|r| r.timestamp));
        }
    }
    let timestamps: Vec<NaiveDateTime> = all_timestamps.into_iter().collect();

    let mut bars = HashMap::with_capacity(symbols.len());
    for symbol in symbols {
        let rows = symbol_rows.remove(symbol).unwrap_or_default();
        let filled = match alignment {
            Alignment::Union => forward_fill(&reindex(&rows, &timestamps)),
            Alignment::PerSymbol => forward_fill(&rows),
        };
        bars.insert(symbol.clone(), filled);
    }

    AlignedData {
        timestamps,
        bars,
        symbols: symbols.to_vec(),
    }
}

/// Place `rows` onto `index`, inserting an all-missing row for every
/// timestamp the symbol has no observation for.
fn reindex(rows: &[RawBar], index: &[NaiveDateTime]) -> Vec<RawBar> {
    let by_timestamp: HashMap<NaiveDateTime, &RawBar> =
        rows.iter().map(|r| (r.timestamp, r)).collect();

    index
        .iter()
        .map(|ts| {
            by_timestamp
                .get(ts)
                .map(|r| (*r).clone())
                .unwrap_or_else(|| missing_row(*ts))
        })
        .collect()
}

fn missing_row(timestamp: NaiveDateTime) -> RawBar {
    RawBar {
        timestamp,
        open: None,
        high: None,
        low: None,
        close: None,
        volume: None,
    }
}

/// Fill gaps in a time-ordered row sequence.
///
/// Volume is filled with 0 before anything is carried, so a missing volume
/// never inherits the previous row's volume.
pub fn forward_fill(rows: &[RawBar]) -> Vec<Bar> {
    let mut open = None;
    let mut high = None;
    let mut low = None;
    let mut close = None;

    let mut filled = Vec::with_capacity(rows.len());
    for row in rows {
        open = row.open.or(open);
        high = row.high.or(high);
        low = row.low.or(low);
        close = row.close.or(close);

        filled.push(Bar {
            timestamp: row.timestamp,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close: close.unwrap_or(f64::NAN),
            volume: row.volume.unwrap_or(0),
        });
    }
    filled
}
