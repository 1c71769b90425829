//! Feed configuration: where the per-symbol files live and how to read them.
//!
//! Stored as TOML:
//!
//! ```toml
//! source_directory = "/data/kibot"
//! symbols = ["AAPL", "MSFT"]
//! alignment = "union"
//!
//! [format]
//! extension = "txt"
//! max_rows = 50
//! ```
//!
//! The event channel is not part of the config; it is handed to the feed
//! constructor by the driver that owns the queue.

use crate::data::align::Alignment;
use crate::domain::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Construction options for a historic feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Directory containing one `<symbol>.<extension>` file per symbol.
    pub source_directory: PathBuf,
    /// Symbols to load, in the order the feed steps through them.
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub format: SourceFormat,
    #[serde(default)]
    pub alignment: Alignment,
}

/// Layout of the per-symbol source files.
///
/// Columns are read by position: `date, time, open, high, low, close, volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFormat {
    /// File extension without the dot.
    pub extension: String,
    /// Whether the first row is a header (its names are ignored).
    pub has_headers: bool,
    pub delimiter: char,
    /// Cap on data rows read per file. `None` reads everything.
    pub max_rows: Option<usize>,
    /// chrono format for the `date` column; common formats are tried when unset.
    pub date_format: Option<String>,
    /// chrono format for the `time` column; common formats are tried when unset.
    pub time_format: Option<String>,
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self {
            extension: "csv".to_string(),
            has_headers: true,
            delimiter: ',',
            max_rows: None,
            date_format: None,
            time_format: None,
        }
    }
}

impl SourceFormat {
    /// Path of the source file for `symbol` under `dir`.
    pub fn path_for(&self, dir: &Path, symbol: &str) -> PathBuf {
        dir.join(format!("{symbol}.{}", self.extension))
    }
}

impl FeedConfig {
    pub fn new(source_directory: impl Into<PathBuf>, symbols: Vec<Symbol>) -> Self {
        Self {
            source_directory: source_directory.into(),
            symbols,
            format: SourceFormat::default(),
            alignment: Alignment::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("symbol names must not be blank".into()));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::Invalid(format!("symbol '{symbol}' listed twice")));
            }
        }
        if self.format.extension.is_empty() {
            return Err(ConfigError::Invalid("format.extension must not be empty".into()));
        }
        if !self.format.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "format.delimiter must be a single ASCII character, got '{}'",
                self.format.delimiter
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = FeedConfig::from_toml(
            r#"
source_directory = "/data"
symbols = ["AAPL"]
"#,
        )
        .unwrap();

        assert_eq!(config.source_directory, PathBuf::from("/data"));
        assert_eq!(config.symbols, vec!["AAPL".to_string()]);
        assert_eq!(config.format, SourceFormat::default());
        assert_eq!(config.alignment, Alignment::Union);
    }

    #[test]
    fn full_toml_overrides_format() {
        let config = FeedConfig::from_toml(
            r#"
source_directory = "/data/kibot"
symbols = ["AAPL", "MSFT"]
alignment = "per_symbol"

[format]
extension = "txt"
has_headers = false
delimiter = ";"
max_rows = 50
date_format = "%m/%d/%Y"
"#,
        )
        .unwrap();

        assert_eq!(config.alignment, Alignment::PerSymbol);
        assert_eq!(config.format.extension, "txt");
        assert!(!config.format.has_headers);
        assert_eq!(config.format.delimiter, ';');
        assert_eq!(config.format.max_rows, Some(50));
        assert_eq!(config.format.date_format.as_deref(), Some("%m/%d/%Y"));
        assert_eq!(config.format.time_format, None);
    }

    #[test]
    fn empty_symbol_list_is_rejected() {
        let err = FeedConfig::from_toml(
            r#"
source_directory = "/data"
symbols = []
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_symbol_is_rejected() {
        let config = FeedConfig::new("/data", vec!["AAPL".into(), "AAPL".into()]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = FeedConfig::from_toml("symbols = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FeedConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn path_for_joins_symbol_and_extension() {
        let format = SourceFormat {
            extension: "txt".into(),
            ..SourceFormat::default()
        };
        assert_eq!(
            format.path_for(Path::new("/data"), "AAPL"),
            PathBuf::from("/data/AAPL.txt")
        );
    }
}
