//! src/config.rs
//! ============================================================================
//! # Config: Pipeline, Cache and Logging Configuration
//!
//! Loads and saves settings as TOML from the platform config path using the
//! [`directories`](https://docs.rs/directories) crate. Every timing constant
//! the retrieval pipeline relies on lives here so it can be tuned without a
//! rebuild.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save().await?;
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use tokio::fs as TokioFs;

use crate::error::{AppError, AppResult};
use crate::logging::LoggerConfig;

/// Timing policy for the retrieval pipeline.
///
/// None of these values are correctness requirements. They were tuned for
/// perceived smoothness: small enough that a selection never feels stuck,
/// large enough that quick background results land in the first update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How long `retrieve` waits for the remaining-data job.
    #[serde(with = "humantime_serde")]
    pub main_poll_window: Duration,

    /// How long `retrieve` waits for a directory/application size job.
    #[serde(with = "humantime_serde")]
    pub size_poll_window: Duration,

    /// Jobs running longer than this get their delivery postponed.
    #[serde(with = "humantime_serde")]
    pub slow_job_threshold: Duration,

    /// Postponement applied to slow job deliveries.
    #[serde(with = "humantime_serde")]
    pub late_delivery_delay: Duration,

    /// Delay before a UI should show a loading indicator.
    #[serde(with = "humantime_serde")]
    pub loader_delay: Duration,

    /// Worker threads for the background runtime.
    pub worker_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            main_poll_window: Duration::from_millis(20),
            size_poll_window: Duration::from_millis(50),
            slow_job_threshold: Duration::from_millis(50),
            late_delivery_delay: Duration::from_millis(200),
            loader_delay: Duration::from_millis(10),
            worker_threads: 4,
        }
    }
}

/// Size cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached paths
    pub max_capacity: u64,

    /// Lifetime of a cached directory size
    #[serde(with = "humantime_serde")]
    pub directory_ttl: Duration,

    /// Lifetime of a cached application bundle size
    #[serde(with = "humantime_serde")]
    pub application_ttl: Duration,

    /// Enable hit/miss counters
    pub enable_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 4_096,
            directory_ttl: Duration::from_secs(10),
            application_ttl: Duration::from_secs(60 * 10),
            enable_stats: true,
        }
    }
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggerConfig,
}

impl Config {
    /// Loads config from the TOML file in the platform config dir, or writes
    /// and returns the defaults when none exists yet.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            info!("Loading config from {}", path.display());
            let text = TokioFs::read_to_string(&path)
                .await
                .map_err(|source| AppError::ConfigIo {
                    path: path.clone(),
                    source,
                })?;

            Ok(Self::from_toml_str(&text)?)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save().await?;

            Ok(default_config)
        }
    }

    /// Saves config to the TOML file in the platform config dir.
    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;

        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        TokioFs::write(&path, self.to_toml_string()?).await?;

        Ok(())
    }

    /// Parse a config from TOML text. Missing sections fall back to defaults.
    pub fn from_toml_str(text: &str) -> AppResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> AppResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the config directory (without filename).
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "selinfo", "selinfo")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}
