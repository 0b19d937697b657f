//! src/logging.rs
//! ============================================================================
//! # Structured logging
//!
//! Events carry `marker` and `operation_type` fields so a JSON log can be
//! filtered per subsystem (`JOB`, `SIZE_TASK`, `CACHE_OPERATION`, ...).
//! The builder installs an `EnvFilter`, a JSON layer writing through a
//! non-blocking rolling file appender and, optionally, a compact stderr layer.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: CompactString,
    pub log_level: CompactString,
    pub max_log_files: usize,
    pub rotation: LogRotation,
    pub mirror_stderr: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    Daily,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: CompactString::const_new("selinfo"),
            log_level: CompactString::const_new("info"),
            max_log_files: 10,
            rotation: LogRotation::Daily,
            mirror_stderr: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Quick stderr-only tracing for tools and tests.
pub struct Logger;

impl Logger {
    /// Install a compact stderr subscriber honouring `RUST_LOG`.
    /// Silently does nothing when a subscriber is already installed.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    }
}

// Logger builder
pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the global subscriber. Keep the returned guard alive for the
    /// lifetime of the process or buffered lines are lost.
    pub fn build(self) -> Result<WorkerGuard> {
        validate_config(&self.config)?;
        setup_log_directory(&self.config.log_dir)?;

        let rotation = match self.config.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };

        let file_appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(self.config.log_file_prefix.as_str())
            .filename_suffix("jsonl")
            .max_log_files(self.config.max_log_files)
            .build(&self.config.log_dir)
            .context("Failed to create file appender")?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let level_str = self.config.log_level.clone();
        let make_filter = || -> Result<EnvFilter> {
            Ok(EnvFilter::from_default_env().add_directive(
                Directive::from_str(&level_str).context("Invalid log level in config")?,
            ))
        };

        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(non_blocking)
            .with_filter(make_filter()?);

        let stderr_layer = if self.config.mirror_stderr {
            Some(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_filter(make_filter()?),
            )
        } else {
            None
        };

        tracing_subscriber::registry()
            .with(json_layer)
            .with(stderr_layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        Ok(guard)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_config(config: &LoggerConfig) -> Result<()> {
    if config.max_log_files == 0 {
        return Err(
            LoggingError::ConfigError("Max log files must be greater than 0".to_string()).into(),
        );
    }

    if config.log_file_prefix.is_empty() {
        return Err(LoggingError::ConfigError("Empty log file prefix".to_string()).into());
    }

    Directive::from_str(&config.log_level)
        .map_err(|e| LoggingError::ConfigError(format!("Invalid log level: {e}")))?;

    validate_log_directory(&config.log_dir)?;
    Ok(())
}

fn validate_log_directory(path: &Path) -> Result<()> {
    if path.components().count() == 0 {
        return Err(LoggingError::InvalidLogDirectory("Empty path".to_string()).into());
    }

    if path.exists() && !path.is_dir() {
        return Err(LoggingError::InvalidLogDirectory(format!(
            "{} is not a directory",
            path.display()
        ))
        .into());
    }

    Ok(())
}

fn setup_log_directory(log_dir: &Path) -> Result<()> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)
            .map_err(LoggingError::DirectoryCreationFailed)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_log_files() {
        let config = LoggerConfig {
            max_log_files: 0,
            ..LoggerConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_file_as_log_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(validate_log_directory(file.path()).is_err());
    }

    #[test]
    fn builder_validates_the_supplied_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LoggerConfig {
            log_file_prefix: CompactString::default(),
            log_dir: log_dir.clone(),
            ..LoggerConfig::default()
        };

        assert!(LoggerBuilder::new().with_config(config).build().is_err());
        assert!(!log_dir.exists());
    }

    #[test]
    fn accepts_defaults() {
        assert!(validate_config(&LoggerConfig::default()).is_ok());
    }

    #[test]
    fn rotation_parses_from_lowercase() {
        let config: LoggerConfig = toml::from_str("rotation = \"hourly\"").unwrap();
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert_eq!(config.max_log_files, 10);
    }
}
