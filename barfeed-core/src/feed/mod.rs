//! Bar feeds: the pull-based, one-step-at-a-time view of market data.
//!
//! The backtest driver only sees [`BarFeed`]. A historic feed replays a
//! [`BarStore`](crate::data::BarStore); a live feed drains per-symbol
//! channels filled by a streaming source. Both append to a per-symbol
//! history that lookback queries read, and both signal the driver with one
//! [`MarketEvent`] per `update_bars` call.

pub mod historic;
pub mod history;
pub mod live;

pub use historic::HistoricFileFeed;
pub use history::BarHistory;
pub use live::{LiveStreamFeed, LiveStreamHandles};

use crate::domain::{Bar, Symbol};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// "Market data updated" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketEvent;

/// Driver-owned, unbounded FIFO the feed enqueues notifications on.
pub type EventSender = mpsc::UnboundedSender<MarketEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<MarketEvent>;

/// Create the notification queue a driver hands to a feed.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Whether more data remains. Once `Finished`, always `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedState {
    Running,
    Finished,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("symbol '{symbol}' is not registered with this feed")]
    UnknownSymbol { symbol: Symbol },

    #[error("no symbols to stream")]
    NoSymbols,

    #[error("symbol '{symbol}' listed more than once")]
    DuplicateSymbol { symbol: Symbol },
}

/// The capability set the backtest loop depends on.
///
/// Historic replay and live streaming are interchangeable behind this trait.
pub trait BarFeed: Send {
    /// Registered symbols, in stepping order.
    fn symbols(&self) -> &[Symbol];

    /// The last `n` consumed bars for `symbol`, oldest first, or fewer if
    /// fewer have been consumed.
    ///
    /// An unregistered symbol is reported and yields `None`; it never
    /// aborts the caller. Treat `None` and an empty slice as "no data yet".
    fn get_latest_bars(&self, symbol: &str, n: usize) -> Option<&[Bar]>;

    /// Advance every symbol by at most one bar, then enqueue exactly one
    /// [`MarketEvent`], whether or not anything advanced.
    fn update_bars(&mut self);

    /// Sticky continuation flag: false from the first exhaustion onward.
    fn continue_backtest(&self) -> bool;

    fn state(&self) -> FeedState {
        if self.continue_backtest() {
            FeedState::Running
        } else {
            FeedState::Finished
        }
    }
}

/// Enqueue one notification. A driver that dropped its receiver is not an
/// error for the feed.
pub(crate) fn notify(events: &EventSender) {
    if events.send(MarketEvent).is_err() {
        debug!("event receiver dropped; market event discarded");
    }
}

pub(crate) fn check_symbols(symbols: &[Symbol]) -> Result<(), FeedError> {
    if symbols.is_empty() {
        return Err(FeedError::NoSymbols);
    }
    for (i, symbol) in symbols.iter().enumerate() {
        if symbols[..i].contains(symbol) {
            return Err(FeedError::DuplicateSymbol {
                symbol: symbol.clone(),
            });
        }
    }
    Ok(())
}
