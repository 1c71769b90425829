//! Per-symbol history buffers: the bars consumed so far.
//!
//! Append-only and unbounded. Lookback queries slice the tail.

use super::FeedError;
use crate::domain::{Bar, Symbol};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Default)]
pub struct BarHistory {
    bars: HashMap<Symbol, Vec<Bar>>,
}

impl BarHistory {
    /// Register `symbols` with empty buffers.
    pub fn new(symbols: &[Symbol]) -> Self {
        Self {
            bars: symbols.iter().map(|s| (s.clone(), Vec::new())).collect(),
        }
    }

    pub fn push(&mut self, symbol: &str, bar: Bar) -> Result<(), FeedError> {
        self.bars
            .get_mut(symbol)
            .ok_or_else(|| unknown(symbol))?
            .push(bar);
        Ok(())
    }

    /// The last `min(n, len)` bars in consumption order.
    pub fn latest(&self, symbol: &str, n: usize) -> Result<&[Bar], FeedError> {
        let bars = self.bars.get(symbol).ok_or_else(|| unknown(symbol))?;
        Ok(&bars[bars.len().saturating_sub(n)..])
    }

    /// [`latest`](Self::latest), with an unknown symbol reported and
    /// swallowed.
    pub fn latest_or_report(&self, symbol: &str, n: usize) -> Option<&[Bar]> {
        match self.latest(symbol, n) {
            Ok(bars) => Some(bars),
            Err(err) => {
                warn!("{err}; no bars returned");
                None
            }
        }
    }

    /// Most recent bar for `symbol`, if any has been consumed.
    pub fn last(&self, symbol: &str) -> Option<&Bar> {
        self.bars.get(symbol).and_then(|b| b.last())
    }

    pub fn len(&self, symbol: &str) -> Option<usize> {
        self.bars.get(symbol).map(Vec::len)
    }
}

fn unknown(symbol: &str) -> FeedError {
    FeedError::UnknownSymbol {
        symbol: symbol.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(minute: u32) -> Bar {
        let close = 100.0 + minute as f64;
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, minute, 0)
                .unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }
    }

    fn history_with(n: u32) -> BarHistory {
        let mut history = BarHistory::new(&["AAPL".to_string()]);
        for minute in 0..n {
            history.push("AAPL", bar(minute)).unwrap();
        }
        history
    }

    #[test]
    fn new_history_is_empty() {
        let history = BarHistory::new(&["AAPL".to_string()]);
        assert_eq!(history.len("AAPL"), Some(0));
        assert!(history.latest("AAPL", 5).unwrap().is_empty());
        assert!(history.last("AAPL").is_none());
    }

    #[test]
    fn latest_returns_tail_in_order() {
        let history = history_with(5);
        let tail = history.latest("AAPL", 3).unwrap();
        let minutes: Vec<f64> = tail.iter().map(|b| b.close - 100.0).collect();
        assert_eq!(minutes, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn latest_caps_at_buffer_length() {
        let history = history_with(2);
        assert_eq!(history.latest("AAPL", 100).unwrap().len(), 2);
    }

    #[test]
    fn latest_zero_is_empty() {
        let history = history_with(3);
        assert!(history.latest("AAPL", 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_symbol_is_an_error_or_none() {
        let mut history = history_with(1);
        assert!(matches!(
            history.latest("MSFT", 1),
            Err(FeedError::UnknownSymbol { .. })
        ));
        assert!(history.latest_or_report("MSFT", 1).is_none());
        assert!(history.push("MSFT", bar(0)).is_err());
        assert_eq!(history.len("MSFT"), None);
    }

    #[test]
    fn last_is_most_recent_push() {
        let history = history_with(4);
        assert_eq!(history.last("AAPL"), Some(&bar(3)));
    }
}
