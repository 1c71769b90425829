//! Domain types for the bar feed

pub mod bar;
pub mod ids;

pub use bar::{Bar, BarField};
pub use ids::DatasetHash;

/// Symbol type alias
pub type Symbol = String;
