//! Live feed: bars arrive on per-symbol channels from a streaming source.
//!
//! The producer side holds [`LiveStreamHandles`]; the feed drains at most one
//! bar per symbol per step with `try_recv`, so stepping never blocks. An
//! empty channel means no new bar this tick. A channel whose senders are all
//! gone is exhausted, which finishes the feed exactly like running off the
//! end of a historic table.

use super::history::BarHistory;
use super::{check_symbols, notify, BarFeed, EventSender, FeedError};
use crate::domain::{Bar, Symbol};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

pub struct LiveStreamFeed {
    symbols: Vec<Symbol>,
    /// Parallel to `symbols`.
    receivers: Vec<UnboundedReceiver<Bar>>,
    exhausted: Vec<bool>,
    history: BarHistory,
    events: EventSender,
    continue_backtest: bool,
}

/// Producer side of a [`LiveStreamFeed`]: one bar sender per symbol.
#[derive(Debug)]
pub struct LiveStreamHandles {
    senders: HashMap<Symbol, UnboundedSender<Bar>>,
}

impl LiveStreamHandles {
    /// A sender for `symbol`, for handing to a producer task.
    pub fn sender(&self, symbol: &str) -> Option<UnboundedSender<Bar>> {
        self.senders.get(symbol).cloned()
    }

    /// Publish a bar for `symbol`.
    ///
    /// Fails only for a symbol the feed does not know. A bar sent after the
    /// feed itself was dropped is discarded.
    pub fn send(&self, symbol: &str, bar: Bar) -> Result<(), FeedError> {
        let sender = self
            .senders
            .get(symbol)
            .ok_or_else(|| FeedError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        if sender.send(bar).is_err() {
            debug!(symbol, "live feed dropped; bar discarded");
        }
        Ok(())
    }

    /// Drop this handle's sender for `symbol`. Once every clone is gone the
    /// feed sees the stream as ended. Returns false for an unknown symbol.
    pub fn close(&mut self, symbol: &str) -> bool {
        self.senders.remove(symbol).is_some()
    }
}

impl LiveStreamFeed {
    pub fn new(
        events: EventSender,
        symbols: Vec<Symbol>,
    ) -> Result<(Self, LiveStreamHandles), FeedError> {
        check_symbols(&symbols)?;

        let mut senders = HashMap::with_capacity(symbols.len());
        let mut receivers = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(symbol.clone(), tx);
            receivers.push(rx);
        }

        let feed = Self {
            history: BarHistory::new(&symbols),
            exhausted: vec![false; symbols.len()],
            symbols,
            receivers,
            events,
            continue_backtest: true,
        };
        Ok((feed, LiveStreamHandles { senders }))
    }
}

impl BarFeed for LiveStreamFeed {
    fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    fn get_latest_bars(&self, symbol: &str, n: usize) -> Option<&[Bar]> {
        self.history.latest_or_report(symbol, n)
    }

    fn update_bars(&mut self) {
        for (i, symbol) in self.symbols.iter().enumerate() {
            if self.exhausted[i] {
                continue;
            }
            match self.receivers[i].try_recv() {
                Ok(bar) => {
                    let stale = self
                        .history
                        .last(symbol)
                        .is_some_and(|last| bar.timestamp <= last.timestamp);
                    if stale {
                        warn!(
                            "{symbol}: dropping out-of-order bar at {}",
                            bar.timestamp
                        );
                        continue;
                    }
                    if let Err(err) = self.history.push(symbol, bar) {
                        warn!("{err}; bar dropped");
                    }
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.exhausted[i] = true;
                    if self.continue_backtest {
                        self.continue_backtest = false;
                        info!("{symbol} stream ended; feed finished");
                    }
                }
            }
        }

        debug!(running = self.continue_backtest, "live bars updated");
        notify(&self.events);
    }

    fn continue_backtest(&self) -> bool {
        self.continue_backtest
    }
}
