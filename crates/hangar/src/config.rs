//! Configuration management for hangar.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::status::{StatusPolicy, DEFAULT_DUE_WINDOW_DAYS};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "hangar";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "hangar.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `HANGAR_`, sections split on `__`)
/// 2. TOML config file at `~/.config/hangar/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Status evaluation configuration.
    pub status: StatusConfig,
    /// Parts catalog configuration.
    pub catalog: CatalogConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/hangar/hangar.db`
    pub database_path: Option<PathBuf>,
}

/// Status evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Days ahead of the next-due date at which an item becomes due.
    pub due_window_days: i64,
}

/// Parts catalog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Maximum number of products returned by a search or listing.
    pub search_limit: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            due_window_days: DEFAULT_DUE_WINDOW_DAYS,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { search_limit: 50 }
    }
}

impl Config {
    /// Load configuration from defaults, the config file and the
    /// environment. `None` reads the default config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("HANGAR_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if let Err(err) = StatusPolicy::with_due_window_days(self.status.due_window_days) {
            return Err(Error::ConfigValidation {
                message: format!("status.due_window_days: {err}"),
            });
        }

        if self.catalog.search_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "catalog.search_limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Build the status policy described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the due window is invalid.
    pub fn status_policy(&self) -> Result<StatusPolicy> {
        Ok(StatusPolicy::with_due_window_days(
            self.status.due_window_days,
        )?)
    }
}
