//! Process configuration for embedders.
//!
//! # Responsibility
//! - Resolve database path, logging settings and event buffer size.
//! - Accept JSON documents and `GRIDBASE_*` environment variables.
//!
//! # Invariants
//! - A returned `CoreConfig` has passed `validate()`.
//! - Unset values fall back to `CoreConfig::default()`.

use crate::logging::{default_log_level, normalize_level};
use crate::sync::event_bus::DEFAULT_EVENT_BUFFER;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "GRIDBASE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "GRIDBASE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GRIDBASE_LOG_DIR";
pub const ENV_EVENT_BUFFER: &str = "GRIDBASE_EVENT_BUFFER";

const DEFAULT_DB_FILE_NAME: &str = "gridbase.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    /// Document is not valid JSON for `CoreConfig`.
    InvalidJson(serde_json::Error),
    /// A field holds an unusable value.
    InvalidValue { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "invalid config json: {err}"),
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidJson(value)
    }
}

/// Runtime settings shared by core, API and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging stays off while unset.
    pub log_dir: Option<PathBuf>,
    /// Per-table event buffer of the live-update bus.
    pub event_buffer: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON document; missing fields use defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `GRIDBASE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(value) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read(ENV_EVENT_BUFFER) {
            config.event_buffer = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "event_buffer",
                message: format!("`{value}` is not a positive integer"),
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "db_path",
                message: "must not be empty".to_string(),
            });
        }
        normalize_level(&self.log_level).map_err(|message| ConfigError::InvalidValue {
            key: "log_level",
            message,
        })?;
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: "log_dir",
                    message: format!("must be absolute, got `{}`", log_dir.display()),
                });
            }
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "event_buffer",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
