//! Data loading: source files, alignment, gap filling, the bar store

pub mod align;
pub mod source;
pub mod store;
pub mod synthetic;

pub use align::{align_symbols, forward_fill, AlignedData, Alignment};
pub use source::{read_symbol_file, sort_and_dedup, LoadError, RawBar};
pub use store::BarStore;
pub use synthetic::{generate_synthetic_bars, write_symbol_file};
