//! Application settings loaded from `config.toml`.
//!
//! Every field has a default so a missing file or a partial file is fine. The
//! `DATABASE_URL` environment variable, typically supplied through `.env`, overrides
//! the configured database URL.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "POCKET_LEDGER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Store settings
    pub database: DatabaseSettings,
    /// Ledger behaviour settings
    pub ledger: LedgerSettings,
}

/// Where and how to connect to the store.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseSettings {
    /// sea-orm connection URL
    pub url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://data/pocket_ledger.sqlite?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// Listing settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerSettings {
    /// Rows per page in transaction listings
    pub page_size: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// Parses configuration from TOML text and checks it.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    validate(&config)?;
    Ok(config)
}

/// Loads configuration from a TOML file. A missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    if !path_ref.exists() {
        tracing::info!("No config file at {:?}, using defaults", path_ref);
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration the way the binary does: config path from the environment or
/// `./config.toml`, then the `DATABASE_URL` override.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(&path)?;
    if let Ok(url) = std::env::var("DATABASE_URL") {
        tracing::debug!("DATABASE_URL overrides configured database url");
        config.database.url = url;
    }
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.ledger.page_size == 0 {
        return Err(Error::Config {
            message: "ledger.page_size must be at least 1".to_string(),
        });
    }
    if config.database.max_connections == 0 {
        return Err(Error::Config {
            message: "database.max_connections must be at least 1".to_string(),
        });
    }
    Ok(())
}
