//! Configuration structures shared across the workspace

use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
    /// Connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "meridian.db".to_string(), pool_size: 4 }
    }
}

/// Sync engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum lifetime of a watch channel. The remote service caps channel
    /// lifetimes; new channels expire this many days from creation.
    pub channel_ttl_days: i64,
    /// Channels expiring within this many hours are refreshed by the
    /// background sweep.
    pub refresh_lead_time_hours: i64,
    /// Interval between refresh sweeps, in seconds.
    pub refresh_poll_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_ttl_days: 7,
            refresh_lead_time_hours: 24,
            refresh_poll_interval_secs: 3_600,
        }
    }
}
