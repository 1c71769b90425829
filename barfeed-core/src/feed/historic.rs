//! Historic replay of a [`BarStore`], one bar per symbol per step.

use super::history::BarHistory;
use super::{notify, BarFeed, EventSender};
use crate::config::FeedConfig;
use crate::data::{BarStore, LoadError};
use crate::domain::{Bar, Symbol};
use tracing::{debug, info, warn};

/// Position of one symbol in its table.
///
/// Exhaustion is detected on the step that yields the last bar, not on the
/// step after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    next: usize,
    exhausted: bool,
}

impl Cursor {
    fn advance<'a>(&mut self, table: &'a [Bar]) -> Option<&'a Bar> {
        if self.exhausted {
            return None;
        }
        let bar = table.get(self.next);
        if bar.is_some() {
            self.next += 1;
        }
        if self.next >= table.len() {
            self.exhausted = true;
        }
        bar
    }
}

pub struct HistoricFileFeed {
    store: BarStore,
    /// Parallel to `store.symbols()`.
    cursors: Vec<Cursor>,
    history: BarHistory,
    events: EventSender,
    continue_backtest: bool,
    steps: u64,
}

impl HistoricFileFeed {
    /// Load every configured symbol's file and prepare to replay it.
    ///
    /// All file I/O happens here; stepping never touches the filesystem.
    pub fn new(events: EventSender, config: &FeedConfig) -> Result<Self, LoadError> {
        let store = BarStore::load(config)?;
        Ok(Self::from_store(events, store))
    }

    pub fn from_store(events: EventSender, store: BarStore) -> Self {
        let history = BarHistory::new(store.symbols());
        let cursors = vec![Cursor::default(); store.symbols().len()];
        Self {
            store,
            cursors,
            history,
            events,
            continue_backtest: true,
            steps: 0,
        }
    }

    pub fn store(&self) -> &BarStore {
        &self.store
    }

    /// Number of `update_bars` calls so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl BarFeed for HistoricFileFeed {
    fn symbols(&self) -> &[Symbol] {
        self.store.symbols()
    }

    fn get_latest_bars(&self, symbol: &str, n: usize) -> Option<&[Bar]> {
        self.history.latest_or_report(symbol, n)
    }

    fn update_bars(&mut self) {
        self.steps += 1;

        for (symbol, cursor) in self.store.symbols().iter().zip(self.cursors.iter_mut()) {
            if cursor.exhausted {
                continue;
            }
            let table = self.store.bars(symbol).unwrap_or(&[]);

            if let Some(bar) = cursor.advance(table) {
                if let Err(err) = self.history.push(symbol, bar.clone()) {
                    warn!("{err}; bar dropped");
                }
            }

            if cursor.exhausted && self.continue_backtest {
                self.continue_backtest = false;
                info!(
                    "{symbol} exhausted after {} bars on step {}; feed finished",
                    cursor.next, self.steps
                );
            }
        }

        debug!(step = self.steps, running = self.continue_backtest, "bars updated");
        notify(&self.events);
    }

    fn continue_backtest(&self) -> bool {
        self.continue_backtest
    }
}
