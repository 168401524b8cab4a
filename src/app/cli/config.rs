//! TOML configuration file loading
//!
//! The file is optional. When `--config-file` is not given the default
//! location under the user's config directory is used if it exists. Values
//! given on the command line override the file.

use super::args::Args;
use crate::aggregator::HandlerSettings;
use crate::core::error_handling::{error_chain, ContextualError};
use crate::core::logging::LoggingSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GROUP_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_REAPER_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<String> {
        Some(error_chain(self))
    }
}

/// `[reaper]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaperSettings {
    pub group_timeout_ms: u64,
    pub interval_ms: u64,
    /// Run a last expiry pass at end of input
    pub expire_on_stop: bool,
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self {
            group_timeout_ms: DEFAULT_GROUP_TIMEOUT_MS,
            interval_ms: DEFAULT_REAPER_INTERVAL_MS,
            expire_on_stop: true,
        }
    }
}

impl ReaperSettings {
    pub fn group_timeout(&self) -> Duration {
        Duration::from_millis(self.group_timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// `[store]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub capacity: Option<usize>,
}

/// `[output]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub append_newline: bool,
    /// Output buffer size in bytes; 0 keeps the default
    pub buffer_size: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            append_newline: true,
            buffer_size: 0,
        }
    }
}

/// Complete configuration, as read from the TOML file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub logging: LoggingSettings,
    pub handler: HandlerSettings,
    pub reaper: ReaperSettings,
    pub store: StoreSettings,
    pub output: OutputSettings,
}

/// `<config dir>/Correlate/correlate.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("Correlate").join("correlate.toml"))
}

impl FileConfig {
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load the explicit file, else the default file if present, else defaults
    pub async fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match config_file {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No configuration file; using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        let config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load, apply command-line overrides and validate
    pub async fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Self::load(args.config_file.as_deref()).await?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Override file values with those given on the command line
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(format) = args.log_format {
            self.logging.format = format;
        }
        if let Some(file) = &args.log_file {
            self.logging.file = Some(file.clone());
        }
        if let Some(timeout) = args.group_timeout_ms {
            self.reaper.group_timeout_ms = timeout;
        }
        if let Some(interval) = args.reaper_interval_ms {
            self.reaper.interval_ms = interval;
        }
        if let Some(action) = args.expiry_action {
            self.handler.expiry_action = action;
        }
        if let Some(timeout) = args.lock_timeout_ms {
            self.handler.lock_timeout_ms = Some(timeout);
        }
        if let Some(capacity) = args.capacity {
            self.store.capacity = Some(capacity);
        }
        if let Some(newline) = args.append_newline() {
            self.output.append_newline = newline;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if log::LevelFilter::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("'{}' is not a log level", self.logging.level),
            ));
        }
        if self.reaper.group_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "reaper.group_timeout_ms",
                "must be greater than 0",
            ));
        }
        if self.reaper.interval_ms == 0 {
            return Err(ConfigError::invalid(
                "reaper.interval_ms",
                "must be greater than 0",
            ));
        }
        if self.store.capacity == Some(0) {
            return Err(ConfigError::invalid(
                "store.capacity",
                "must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}
