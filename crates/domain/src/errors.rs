//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Meridian
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MeridianError {
    /// Bad or missing identifier, malformed payload. User-caused.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity absent locally or remotely.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The user's grant on the remote calendar was revoked. All sync state
    /// for the user is torn down before this is surfaced.
    #[error("Remote access revoked: {0}")]
    AccessRevoked(String),

    /// The remote service reports the channel or token is gone; a re-sync
    /// resolves it.
    #[error("Channel stale: {0}")]
    ChannelStale(String),

    /// Network or rate-limit failure. Safe to retry at the caller's
    /// discretion; never retried internally.
    #[error("Transient remote error: {0}")]
    Transient(String),

    /// Local and remote state diverged (e.g. a local write failed after the
    /// remote mutation succeeded). Requires operator attention.
    #[error("Internal inconsistency: {0}")]
    Inconsistency(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Meridian operations
pub type Result<T> = std::result::Result<T, MeridianError>;
