//! BarStore: the immutable, time-indexed table set a historic feed replays.
//!
//! Construction is the only phase with I/O: every symbol's file is read,
//! the tables are aligned and gap-filled, and the result is frozen. Nothing
//! on `BarStore` takes `&mut self`.

use super::align::{align_symbols, AlignedData, Alignment};
use super::source::{read_symbol_file, LoadError, RawBar};
use crate::config::FeedConfig;
use crate::domain::{Bar, DatasetHash, Symbol};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use tracing::info;

#[derive(Debug)]
pub struct BarStore {
    symbols: Vec<Symbol>,
    timestamps: Vec<NaiveDateTime>,
    bars: HashMap<Symbol, Vec<Bar>>,
    alignment: Alignment,
    dataset_hash: DatasetHash,
}

impl BarStore {
    /// Load `<source_directory>/<symbol>.<extension>` for every configured
    /// symbol, then align and fill.
    ///
    /// Fails on the first symbol whose source is missing or unparsable.
    pub fn load(config: &FeedConfig) -> Result<Self, LoadError> {
        check_symbols(&config.symbols)?;
        config.validate()?;

        let total = config.symbols.len();
        let mut raw = HashMap::with_capacity(total);
        for (i, symbol) in config.symbols.iter().enumerate() {
            let path = config.format.path_for(&config.source_directory, symbol);
            let rows = read_symbol_file(symbol, &path, &config.format)?;
            info!(
                "[{}/{}] loaded {} rows for {symbol} from {}",
                i + 1,
                total,
                rows.len(),
                path.display()
            );
            raw.insert(symbol.clone(), rows);
        }

        Self::from_raw(raw, &config.symbols, config.alignment)
    }

    /// Build a store from rows already in memory.
    pub fn from_raw(
        raw: HashMap<Symbol, Vec<RawBar>>,
        symbols: &[Symbol],
        alignment: Alignment,
    ) -> Result<Self, LoadError> {
        check_symbols(symbols)?;

        let aligned = align_symbols(raw, symbols, alignment);
        let dataset_hash = compute_dataset_hash(&aligned);

        info!(
            symbols = aligned.symbols.len(),
            index_len = aligned.timestamps.len(),
            ?alignment,
            hash = %dataset_hash,
            "bar store ready"
        );

        Ok(Self {
            symbols: aligned.symbols,
            timestamps: aligned.timestamps,
            bars: aligned.bars,
            alignment,
            dataset_hash,
        })
    }

    /// Build a store from complete bars (synthetic data, fixtures).
    pub fn from_bars(
        bars: HashMap<Symbol, Vec<Bar>>,
        symbols: &[Symbol],
        alignment: Alignment,
    ) -> Result<Self, LoadError> {
        let raw = bars
            .into_iter()
            .map(|(symbol, bars)| (symbol, bars.iter().map(RawBar::from).collect()))
            .collect();
        Self::from_raw(raw, symbols, alignment)
    }

    /// Symbols in load order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The filled table for `symbol`, or `None` if it was never loaded.
    pub fn bars(&self, symbol: &str) -> Option<&[Bar]> {
        self.bars.get(symbol).map(Vec::as_slice)
    }

    /// Union of all symbols' timestamps.
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self, symbol: &str) -> Option<usize> {
        self.bars.get(symbol).map(Vec::len)
    }

    /// True when no symbol has a single row.
    pub fn is_empty(&self) -> bool {
        self.bars.values().all(Vec::is_empty)
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn dataset_hash(&self) -> &DatasetHash {
        &self.dataset_hash
    }
}

fn check_symbols(symbols: &[Symbol]) -> Result<(), LoadError> {
    if symbols.is_empty() {
        return Err(LoadError::NoSymbols);
    }
    let mut seen = HashSet::with_capacity(symbols.len());
    for symbol in symbols {
        if !seen.insert(symbol.as_str()) {
            return Err(LoadError::DuplicateSymbol {
                symbol: symbol.clone(),
            });
        }
    }
    Ok(())
}

/// Compute a deterministic BLAKE3 hash over all bar data.
///
/// Symbols are hashed in sorted order so the result does not depend on
/// HashMap iteration order or on the requested symbol order.
fn compute_dataset_hash(aligned: &AlignedData) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();

    let mut symbols: Vec<&Symbol> = aligned.bars.keys().collect();
    symbols.sort();

    for symbol in symbols {
        hasher.update(symbol.as_bytes());
        if let Some(bars) = aligned.bars.get(symbol) {
            for bar in bars {
                hasher.update(bar.timestamp.to_string().as_bytes());
                hasher.update(&bar.open.to_le_bytes());
                hasher.update(&bar.high.to_le_bytes());
                hasher.update(&bar.low.to_le_bytes());
                hasher.update(&bar.close.to_le_bytes());
                hasher.update(&bar.volume.to_le_bytes());
            }
        }
    }

    DatasetHash::from_hash(hasher.finalize().to_hex().as_str())
}
