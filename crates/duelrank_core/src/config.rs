//! Engine configuration.
//!
//! # Responsibility
//! - Describe deployment knobs: ledger location, logging, leaderboard sizes.
//! - Load them from JSON with every field defaulted.
//!
//! # Invariants
//! - Elo constants are not configurable; see `rating::elo`.
//! - A loaded config has passed `validate()`.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Ledger database file. `None` opens a private in-memory ledger.
    pub database_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub leaderboard: LeaderboardConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            directory: None,
        }
    }
}

/// Result-size policy for leaderboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeaderboardConfig {
    /// Applied when an overall query asks for 0 rows.
    pub default_limit: u32,
    /// Applied when a per-category query asks for 0 rows.
    pub default_per_category_limit: u32,
    /// Hard cap for any query.
    pub max_limit: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            default_per_category_limit: 3,
            max_limit: 100,
        }
    }
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "malformed config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let board = &self.leaderboard;
        if board.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "leaderboard.max_limit must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("default_limit", board.default_limit),
            ("default_per_category_limit", board.default_per_category_limit),
        ] {
            if value == 0 || value > board.max_limit {
                return Err(ConfigError::Invalid(format!(
                    "leaderboard.{name} must be within 1..={}, got {value}",
                    board.max_limit
                )));
            }
        }
        if let Some(dir) = self.logging.directory.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.directory must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}
