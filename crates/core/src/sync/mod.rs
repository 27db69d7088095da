//! Sync building blocks: persistence ports and the remote→local mapping

pub mod mapping;
pub mod ports;

use chrono::{DateTime, Duration, Utc};

pub use mapping::{map_remote_event, MappedRemoteEvent};
pub use ports::{EventRepository, SyncRepository};

/// Absolute expiration for a new watch channel: the service-defined maximum
/// lifetime from now.
pub fn channel_expiration(ttl_days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(ttl_days)
}
