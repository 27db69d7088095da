//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `MERIDIAN_DB_PATH`: Database file path (required for env loading)
//! - `MERIDIAN_DB_POOL_SIZE`: Connection pool size
//! - `MERIDIAN_CHANNEL_TTL_DAYS`: Watch channel lifetime in days
//! - `MERIDIAN_REFRESH_LEAD_HOURS`: Refresh lead window in hours
//! - `MERIDIAN_REFRESH_POLL_SECS`: Refresh sweep interval in seconds

use std::path::Path;

use meridian_domain::{Config, DatabaseConfig, MeridianError, Result, SyncConfig};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to `config.toml` / `config.json` in
/// the working directory.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            for candidate in ["config.toml", "config.json"] {
                if Path::new(candidate).exists() {
                    return load_from_file(Path::new(candidate));
                }
            }
            Err(MeridianError::Config(
                "no configuration found in environment or config files".to_string(),
            ))
        }
    }
}

/// Load configuration from environment variables.
///
/// `MERIDIAN_DB_PATH` is required; everything else falls back to defaults.
pub fn load_from_env() -> Result<Config> {
    let path = std::env::var("MERIDIAN_DB_PATH")
        .map_err(|_| MeridianError::Config("MERIDIAN_DB_PATH not set".to_string()))?;

    let defaults = SyncConfig::default();
    Ok(Config {
        database: DatabaseConfig {
            path,
            pool_size: env_parse("MERIDIAN_DB_POOL_SIZE", DatabaseConfig::default().pool_size)?,
        },
        sync: SyncConfig {
            channel_ttl_days: env_parse("MERIDIAN_CHANNEL_TTL_DAYS", defaults.channel_ttl_days)?,
            refresh_lead_time_hours: env_parse(
                "MERIDIAN_REFRESH_LEAD_HOURS",
                defaults.refresh_lead_time_hours,
            )?,
            refresh_poll_interval_secs: env_parse(
                "MERIDIAN_REFRESH_POLL_SECS",
                defaults.refresh_poll_interval_secs,
            )?,
        },
    })
}

/// Load configuration from a TOML or JSON file, chosen by extension.
pub fn load_from_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        MeridianError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| MeridianError::Config(format!("invalid TOML config: {e}")))?,
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| MeridianError::Config(format!("invalid JSON config: {e}")))?,
        other => {
            return Err(MeridianError::Config(format!(
                "unsupported config extension: {other:?}"
            )))
        }
    };

    tracing::info!(path = %path.display(), "Configuration loaded from file");
    Ok(config)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| MeridianError::Config(format!("invalid value for {name}: {value}"))),
        Err(_) => Ok(default),
    }
}
