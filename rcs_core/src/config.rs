//! Viewer configuration loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::lexer::DEFAULT_CHUNK_SIZE;

/// Top-level configuration. Every field has a default, so an empty file is
/// a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tokenizer settings.
    pub parser: ParserConfig,
    /// File-log settings.
    pub log: LogConfig,
    /// Directory-listing settings.
    pub listing: ListingConfig,
}

/// Tokenizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Bytes requested from the reader per refill.
    pub chunk_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// File-log settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Ordering used when the caller does not pick one.
    pub sort: LogSort,
}

/// Ordering of file-log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSort {
    /// Ascending revision number.
    #[default]
    Default,
    /// Newest first, ties broken by the higher revision.
    Date,
    /// Highest revision first.
    Revision,
}

impl std::str::FromStr for LogSort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "date" => Ok(Self::Date),
            "revision" | "rev" => Ok(Self::Revision),
            other => Err(ConfigError::Invalid {
                field: "log.sort",
                message: format!("unknown sort order {other:?}"),
            }),
        }
    }
}

/// Directory-listing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Also list archives of removed files kept under `Attic/`.
    pub include_attic: bool,
    /// Report files whose resolved revision is dead as absent.
    pub hide_dead: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            include_attic: true,
            hide_dead: false,
        }
    }
}

/// Failure to load or validate a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong.
        message: String,
    },
}

impl Config {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the errors of [`from_toml`](Self::from_toml).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `parser.chunk_size` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parser.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                field: "parser.chunk_size",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
