//! Barfeed CLI: replay, inspect and generate per-symbol bar files.
//!
//! Commands:
//! - `replay`: build a historic feed, step it, print the latest bars per symbol
//! - `inspect`: load a bar store and report row counts, gaps and the dataset hash
//! - `generate`: write synthetic source files for demos and smoke tests

use anyhow::{bail, Context, Result};
use barfeed_core::data::{generate_synthetic_bars, write_symbol_file};
use barfeed_core::{
    event_channel, Alignment, Bar, BarFeed, BarField, BarStore, FeedConfig, HistoricFileFeed,
    SourceFormat,
};
use chrono::{Duration, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "barfeed",
    version,
    about = "Barfeed CLI: replay historical bars one step at a time"
)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG when set).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step a historic feed and print the latest bars for each symbol.
    Replay {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of update steps. Defaults to running until the feed finishes.
        #[arg(long)]
        steps: Option<usize>,

        /// Lookback window printed per symbol.
        #[arg(long, default_value_t = 10)]
        lookback: usize,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load a bar store and report its shape.
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write synthetic source files.
    Generate {
        /// Output directory (created if missing).
        #[arg(long)]
        dir: PathBuf,

        /// Symbols to generate (e.g., AAPL MSFT).
        #[arg(long, required = true, num_args = 1..)]
        symbols: Vec<String>,

        /// Rows per symbol.
        #[arg(long, default_value_t = 50)]
        rows: usize,

        /// First timestamp (YYYY-MM-DD HH:MM:SS).
        #[arg(long, default_value = "2024-01-02 09:30:00")]
        start: String,

        /// Minutes between bars.
        #[arg(long, default_value_t = 1)]
        interval_minutes: i64,

        /// File extension.
        #[arg(long, default_value = "csv")]
        extension: String,
    },
}

/// Where the per-symbol files are and how to read them.
#[derive(Args)]
struct SourceArgs {
    /// TOML feed config. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory containing `<symbol>.<extension>` files.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Symbols to load, in stepping order.
    #[arg(long, num_args = 1..)]
    symbols: Vec<String>,

    /// Source file extension (default: csv).
    #[arg(long)]
    extension: Option<String>,

    /// Cap on rows read per file.
    #[arg(long)]
    max_rows: Option<usize>,

    /// Source files have no header row.
    #[arg(long, default_value_t = false)]
    no_headers: bool,

    /// How symbols are put on a common index.
    #[arg(long, value_enum)]
    alignment: Option<AlignmentArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignmentArg {
    Union,
    PerSymbol,
}

impl From<AlignmentArg> for Alignment {
    fn from(arg: AlignmentArg) -> Self {
        match arg {
            AlignmentArg::Union => Alignment::Union,
            AlignmentArg::PerSymbol => Alignment::PerSymbol,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay {
            source,
            steps,
            lookback,
            json,
        } => run_replay(&source, steps, lookback, json),
        Commands::Inspect { source } => run_inspect(&source),
        Commands::Generate {
            dir,
            symbols,
            rows,
            start,
            interval_minutes,
            extension,
        } => run_generate(dir, symbols, rows, &start, interval_minutes, extension),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &SourceArgs) -> Result<FeedConfig> {
    let mut config = match &args.config {
        Some(path) => FeedConfig::from_file(path)?,
        None => {
            let Some(dir) = &args.dir else {
                bail!("one of --config or --dir is required");
            };
            if args.symbols.is_empty() {
                bail!("--symbols is required without --config");
            }
            FeedConfig::new(dir, args.symbols.clone())
        }
    };

    if let Some(dir) = &args.dir {
        config.source_directory = dir.clone();
    }
    if !args.symbols.is_empty() {
        config.symbols = args.symbols.clone();
    }
    if let Some(ext) = &args.extension {
        config.format.extension = ext.clone();
    }
    if args.max_rows.is_some() {
        config.format.max_rows = args.max_rows;
    }
    if args.no_headers {
        config.format.has_headers = false;
    }
    if let Some(alignment) = args.alignment {
        config.alignment = alignment.into();
    }

    config.validate()?;
    Ok(config)
}

fn run_replay(source: &SourceArgs, steps: Option<usize>, lookback: usize, json: bool) -> Result<()> {
    let config = build_config(source)?;
    let (tx, mut rx) = event_channel();
    let mut feed = HistoricFileFeed::new(tx, &config)?;

    let mut events = 0usize;
    let mut taken = 0usize;
    loop {
        match steps {
            Some(max) if taken >= max => break,
            None if !feed.continue_backtest() => break,
            _ => {}
        }
        feed.update_bars();
        taken += 1;
        while rx.try_recv().is_ok() {
            events += 1;
        }
    }

    info!(
        "{taken} steps, {events} market events, feed {:?}",
        feed.state()
    );

    if json {
        let symbols: Vec<serde_json::Value> = feed
            .symbols()
            .iter()
            .map(|symbol| {
                serde_json::json!({
                    "symbol": symbol,
                    "bars": feed.get_latest_bars(symbol, lookback).unwrap_or(&[]),
                })
            })
            .collect();
        let out = serde_json::json!({
            "steps": taken,
            "events": events,
            "continue_backtest": feed.continue_backtest(),
            "dataset_hash": feed.store().dataset_hash(),
            "symbols": symbols,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for symbol in feed.symbols() {
        let bars = feed.get_latest_bars(symbol, lookback).unwrap_or(&[]);
        println!("\n{symbol}, last {} of {lookback} requested", bars.len());
        print_bars(bars);
    }
    println!(
        "\n{taken} steps, {events} events, continue_backtest = {}",
        feed.continue_backtest()
    );
    Ok(())
}

fn print_bars(bars: &[Bar]) {
    println!(
        "  {:<19}  {:>10}  {:>10}  {:>10}  {:>10}  {:>10}",
        "timestamp", "open", "high", "low", "close", "volume"
    );
    for bar in bars {
        println!(
            "  {:<19}  {:>10.4}  {:>10.4}  {:>10.4}  {:>10.4}  {:>10}",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );
    }
}

fn run_inspect(source: &SourceArgs) -> Result<()> {
    let config = build_config(source)?;
    let store = BarStore::load(&config)?;

    println!("Source:     {}", config.source_directory.display());
    println!("Alignment:  {:?}", store.alignment());
    println!("Index:      {} timestamps", store.timestamps().len());
    if let (Some(first), Some(last)) = (store.timestamps().first(), store.timestamps().last()) {
        println!("Span:       {first} → {last}");
    }
    println!("Dataset:    {}", store.dataset_hash());
    println!();
    println!(
        "  {:<10}  {:>8}  {:>8}  {:>8}  {:>12}  {:>12}",
        "symbol", "rows", "void", "insane", "close min", "close max"
    );

    for symbol in store.symbols() {
        let bars = store.bars(symbol).unwrap_or(&[]);
        let void = bars.iter().filter(|b| b.is_void()).count();
        let insane = bars.iter().filter(|b| !b.is_void() && !b.is_sane()).count();
        let (low, high) = column_range(bars, BarField::Close)
            .map(|(lo, hi)| (format!("{lo:.4}"), format!("{hi:.4}")))
            .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
        println!(
            "  {:<10}  {:>8}  {:>8}  {:>8}  {:>12}  {:>12}",
            symbol,
            bars.len(),
            void,
            insane,
            low,
            high
        );
    }
    Ok(())
}

/// Min and max of one column over the non-void bars.
fn column_range(bars: &[Bar], field: BarField) -> Option<(f64, f64)> {
    bars.iter()
        .filter(|b| !b.is_void())
        .map(|b| b.value(field))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn run_generate(
    dir: PathBuf,
    symbols: Vec<String>,
    rows: usize,
    start: &str,
    interval_minutes: i64,
    extension: String,
) -> Result<()> {
    if interval_minutes <= 0 {
        bail!("--interval-minutes must be positive");
    }
    let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("invalid --start '{start}'"))?;
    let step = bar_step(start, rows, interval_minutes)?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;

    let format = SourceFormat {
        extension,
        ..SourceFormat::default()
    };
    for symbol in &symbols {
        let bars = generate_synthetic_bars(symbol, start, rows, step);
        let path = write_symbol_file(&dir, symbol, &format, &bars)
            .with_context(|| format!("write source file for {symbol}"))?;
        println!("Wrote {rows} bars for {symbol} to {}", path.display());
    }
    Ok(())
}

/// The spacing between generated bars, checked so the last bar still has
/// a representable timestamp.
fn bar_step(start: NaiveDateTime, rows: usize, interval_minutes: i64) -> Result<Duration> {
    let Some(step) = Duration::try_minutes(interval_minutes) else {
        bail!("--interval-minutes {interval_minutes} is out of range");
    };
    let span = i64::try_from(rows.saturating_sub(1))
        .ok()
        .and_then(|n| interval_minutes.checked_mul(n))
        .and_then(Duration::try_minutes)
        .and_then(|span| start.checked_add_signed(span));
    if span.is_none() {
        bail!(
            "{rows} bars every {interval_minutes} minutes from {start} \
             run past the end of the calendar"
        );
    }
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_args(dir: Option<PathBuf>, symbols: &[&str]) -> SourceArgs {
        SourceArgs {
            config: None,
            dir,
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            extension: None,
            max_rows: None,
            no_headers: false,
            alignment: None,
        }
    }

    #[test]
    fn flags_alone_build_a_config() {
        let args = source_args(Some(PathBuf::from("data")), &["AAPL", "MSFT"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(config.alignment, Alignment::Union);
    }

    #[test]
    fn missing_dir_and_config_is_rejected() {
        let args = source_args(None, &["AAPL"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn flags_override_the_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("feed.toml");
        std::fs::write(
            &path,
            "source_directory = \"data\"\nsymbols = [\"AAPL\"]\n\n[format]\nextension = \"txt\"\n",
        )
        .unwrap();

        let mut args = source_args(None, &["SPY"]);
        args.config = Some(path);
        args.max_rows = Some(50);
        args.alignment = Some(AlignmentArg::PerSymbol);

        let config = build_config(&args).unwrap();
        assert_eq!(config.symbols, vec!["SPY"]);
        assert_eq!(config.format.extension, "txt");
        assert_eq!(config.format.max_rows, Some(50));
        assert_eq!(config.alignment, Alignment::PerSymbol);
    }

    #[test]
    fn duplicate_symbol_flags_fail_validation() {
        let args = source_args(Some(PathBuf::from("data")), &["AAPL", "AAPL"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn oversized_generate_intervals_are_rejected() {
        let start = NaiveDateTime::parse_from_str("2024-01-02 09:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert!(bar_step(start, 10, i64::MAX).is_err());
        assert!(bar_step(start, usize::MAX, 1).is_err());
        assert!(bar_step(start, 100_000_000_000, 1_000_000).is_err());
        assert_eq!(bar_step(start, 50, 5).unwrap(), Duration::minutes(5));

        let tmp = TempDir::new().unwrap();
        let err = run_generate(
            tmp.path().to_path_buf(),
            vec!["AAPL".into()],
            10,
            "2024-01-02 09:30:00",
            i64::MAX,
            "csv".into(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn column_range_skips_void_bars() {
        let ts = NaiveDateTime::parse_from_str("2024-01-02 09:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let bar = |close: f64, volume: u64| Bar {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        };
        let bars = [bar(f64::NAN, 0), bar(12.5, 300), bar(9.0, 100), bar(11.0, 200)];

        assert_eq!(column_range(&bars, BarField::Close), Some((9.0, 12.5)));
        assert_eq!(column_range(&bars, BarField::Volume), Some((100.0, 300.0)));
        assert_eq!(column_range(&bars[..1], BarField::Close), None);
    }

    #[test]
    fn generated_files_replay_to_completion() {
        let tmp = TempDir::new().unwrap();
        run_generate(
            tmp.path().to_path_buf(),
            vec!["AAPL".into()],
            12,
            "2024-01-02 09:30:00",
            5,
            "csv".into(),
        )
        .unwrap();

        let config = build_config(&source_args(Some(tmp.path().to_path_buf()), &["AAPL"])).unwrap();
        let (tx, _rx) = event_channel();
        let mut feed = HistoricFileFeed::new(tx, &config).unwrap();
        while feed.continue_backtest() {
            feed.update_bars();
        }
        assert_eq!(feed.steps(), 12);
    }
}
