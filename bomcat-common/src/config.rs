//! Configuration loading for bomcat services
//!
//! Resolution priority: environment variable → TOML file → compiled default.
//! Environment overrides use the `BOMCAT_` prefix.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing env-filter directive, e.g. "info,bomcat_enrich=debug"
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// TOML configuration for the enrichment service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Bind address for the HTTP server
    pub bind_address: String,
    /// Path to the SQLite database file
    pub database_path: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Enrichment tuning knobs
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    /// Progress hub reconnect policy
    #[serde(default)]
    pub stream: StreamConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:6150".to_string(),
            database_path: "bomcat.db".to_string(),
            logging: LoggingConfig::default(),
            enrichment: EnrichmentConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

/// Tunable parameters for the enrichment pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Bounded worker pool size per job
    pub worker_pool_size: usize,
    /// Per-tier fetch timeout in milliseconds
    pub tier_timeout_ms: u64,
    /// Minimum usable supplier confidence (0-100)
    pub usability_floor: f64,
    /// Score at or above which a run routes to production (0-100)
    pub production_threshold: f64,
    /// Score at or above which a run routes to review (0-100)
    pub review_threshold: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            tier_timeout_ms: 10_000,
            usability_floor: 50.0,
            production_threshold: 95.0,
            review_threshold: 70.0,
        }
    }
}

/// Reconnect/backoff policy for the progress broadcast hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Initial reconnect delay in milliseconds
    pub backoff_base_ms: u64,
    /// Maximum reconnect delay in milliseconds
    pub backoff_max_ms: u64,
    /// Reconnect attempts before the connection enters terminal error
    pub max_reconnect_attempts: u32,
    /// Delay before closing a connection after a terminal job event
    pub close_grace_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            max_reconnect_attempts: 8,
            close_grace_ms: 200,
        }
    }
}

/// Load configuration: ENV override → TOML file → defaults
///
/// `BOMCAT_CONFIG` points to the TOML file; individual overrides
/// (`BOMCAT_BIND_ADDRESS`, `BOMCAT_DATABASE_PATH`) take precedence over
/// whatever the file says.
pub fn load_config() -> Result<TomlConfig> {
    let mut config = match std::env::var("BOMCAT_CONFIG") {
        Ok(path) => read_toml_config(Path::new(&path))?,
        Err(_) => {
            let default_path = Path::new("bomcat.toml");
            if default_path.exists() {
                read_toml_config(default_path)?
            } else {
                TomlConfig::default()
            }
        }
    };

    if let Ok(addr) = std::env::var("BOMCAT_BIND_ADDRESS") {
        tracing::info!("bind_address overridden from environment");
        config.bind_address = addr;
    }
    if let Ok(db) = std::env::var("BOMCAT_DATABASE_PATH") {
        tracing::info!("database_path overridden from environment");
        config.database_path = db;
    }

    Ok(config)
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write a TOML config file (best-effort, used by settings write-back)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
