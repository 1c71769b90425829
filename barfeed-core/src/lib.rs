//! Barfeed Core: historical bar store and pull-based bar feeds.
//!
//! This crate feeds a backtest loop one time-step at a time:
//! - Domain types (bars, symbols, dataset hashes)
//! - Per-symbol source files loaded, aligned on a common index and forward-filled
//! - The `BarFeed` interface with historic replay and live stream variants
//! - Per-symbol history buffers for lookback queries
//! - Feed configuration (TOML) and synthetic data for demos and tests

pub mod config;
pub mod data;
pub mod domain;
pub mod feed;

pub use config::{ConfigError, FeedConfig, SourceFormat};
pub use data::{Alignment, BarStore, LoadError};
pub use domain::{Bar, BarField, Symbol};
pub use feed::{
    event_channel, BarFeed, EventReceiver, EventSender, FeedError, FeedState, HistoricFileFeed,
    LiveStreamFeed, LiveStreamHandles, MarketEvent,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: data handed between a producer thread and the
    /// driver is Send + Sync, and both feed variants can move to a worker.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<data::BarStore>();
        require_sync::<data::BarStore>();
        require_send::<data::RawBar>();
        require_sync::<data::RawBar>();
        require_send::<FeedConfig>();
        require_sync::<FeedConfig>();
        require_send::<MarketEvent>();
        require_sync::<MarketEvent>();

        require_send::<HistoricFileFeed>();
        require_send::<LiveStreamFeed>();
        require_send::<LiveStreamHandles>();
    }

    /// Architecture contract: the driver can hold either variant as a
    /// `Box<dyn BarFeed>` without knowing which one it has.
    #[test]
    fn bar_feed_is_object_safe() {
        fn _check_trait_object_builds(feed: &mut dyn BarFeed) -> Option<usize> {
            feed.update_bars();
            feed.get_latest_bars("SPY", 1).map(<[Bar]>::len)
        }
    }
}
