//! Synthetic bar generation and source-file writing.
//!
//! Produces a simple random walk from a starting price of 100.0, seeded from
//! the symbol name so the same symbol always yields the same series. Used for
//! demos, tests and benches; never mixed into real data.

use crate::config::SourceFormat;
use crate::domain::Bar;
use chrono::{Duration, NaiveDateTime};
use csv::WriterBuilder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Generate `count` bars spaced `step` apart, starting at `start`.
///
/// Stops early if the next timestamp would fall outside chrono's range.
pub fn generate_synthetic_bars(
    symbol: &str,
    start: NaiveDateTime,
    count: usize,
    step: Duration,
) -> Vec<Bar> {
    // Deterministic seed from symbol name
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut timestamp = start;

    for _ in 0..count {
        let ret: f64 = rng.gen_range(-0.01..0.01);
        let open = price;
        let close = price * (1.0 + ret);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(100..10_000u64);

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        match timestamp.checked_add_signed(step) {
            Some(next) => timestamp = next,
            None => break,
        }
    }

    bars
}

/// Write `bars` as `<dir>/<symbol>.<extension>` in the
/// `date,time,open,high,low,close,volume` layout the loader reads.
///
/// Dates and times use the format's own patterns when set, so the file
/// reads back with the same `SourceFormat`.
pub fn write_symbol_file(
    dir: &Path,
    symbol: &str,
    format: &SourceFormat,
    bars: &[Bar],
) -> Result<PathBuf, csv::Error> {
    let path = format.path_for(dir, symbol);
    let mut writer = WriterBuilder::new()
        .delimiter(format.delimiter as u8)
        .from_path(&path)?;

    if format.has_headers {
        writer.write_record(["date", "time", "open", "high", "low", "close", "volume"])?;
    }

    let date_fmt = format.date_format.as_deref().unwrap_or("%Y-%m-%d");
    let time_fmt = format.time_format.as_deref().unwrap_or("%H:%M:%S");
    let price = |v: f64| if v.is_nan() { String::new() } else { v.to_string() };

    for bar in bars {
        writer.write_record([
            bar.timestamp.format(date_fmt).to_string(),
            bar.timestamp.format(time_fmt).to_string(),
            price(bar.open),
            price(bar.high),
            price(bar.low),
            price(bar.close),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(path)
}
