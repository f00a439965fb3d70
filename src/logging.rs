// src/logging.rs

//! Console logging via `tracing`.
//!
//! Initialise once at startup with [`init_logging`]. `RUST_LOG` overrides the
//! configured level, e.g. `RUST_LOG=tagsense=debug`.

use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter};

static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Output format of console logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines on stderr.
    #[default]
    Pretty,
    /// One JSON object per event on stderr.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// `[log]` table of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Level filter (trace, debug, info, warn, error) or a full filter directive.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Builds the filter: `RUST_LOG` if set, else `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, LogError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|_| LogError::InvalidLevel(level.to_string())),
    }
}

/// Installs the global subscriber. Subsequent calls fail with `AlreadyInitialized`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let env_filter = build_filter(&config.level)?;

    match config.format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt_layer::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt_layer::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .flatten_event(true),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let _ = LOGGING_INITIALIZED.set(true);

    tracing::debug!(log_level = %config.level, log_format = %config.format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_config_from_toml() {
        let config: LogConfig = toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.format.to_string(), "json");

        assert!(toml::from_str::<LogConfig>("format = \"xml\"").is_err());
    }
}
