//! Sync-specific error types
//!
//! Provides error classification for sync operations so callers can decide
//! what is retryable, what already resolved itself, and what needs teardown.

use meridian_core::ProviderError;
use meridian_domain::MeridianError;
use thiserror::Error;

/// Categories of sync errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorCategory {
    /// State already exists or is missing in a way the caller caused.
    Conflict,
    /// The referenced entity is gone; often already resolved.
    NotFound,
    /// The user's grant is gone; sync state was torn down.
    AccessRevoked,
    /// Network/rate-limit/server failure; safe to retry.
    Transient,
    /// Local persistence failure.
    Storage,
    /// Anything requiring operator attention.
    Internal,
}

/// Sync operation errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// A channel already watches this user+calendar.
    #[error("watch already exists for user {user_id} on calendar {calendar_id}")]
    WatchAlreadyExists { user_id: String, calendar_id: String },

    /// The watch response carried no resource id; the channel could never be
    /// stopped, so it is not persisted.
    #[error("watch response missing resource id for calendar {0}")]
    MissingResourceId(String),

    /// The remote side reports the channel gone. Local state was cleaned up;
    /// not a hard failure.
    #[error("channel {0} does not exist remotely")]
    ChannelDoesNotExist(String),

    #[error("no active watches for user {0}")]
    NoActiveWatches(String),

    /// A notification referenced a resource id no channel matches.
    #[error("no channel matches resource id {0}")]
    UnknownChannel(String),

    /// The user's grant was revoked; all their sync state was deleted.
    #[error("remote access revoked for user {0}")]
    AccessRevoked(String),

    /// Channel stop failed for a reason other than revocation or absence.
    /// No local state was mutated.
    #[error("failed to stop channel {channel_id}: {source}")]
    StopFailed { channel_id: String, source: ProviderError },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Domain(#[from] MeridianError),
}

impl SyncError {
    /// Get the error category for this error
    pub fn category(&self) -> SyncErrorCategory {
        match self {
            Self::WatchAlreadyExists { .. } => SyncErrorCategory::Conflict,
            Self::ChannelDoesNotExist(_) | Self::NoActiveWatches(_) | Self::UnknownChannel(_) => {
                SyncErrorCategory::NotFound
            }
            Self::AccessRevoked(_) => SyncErrorCategory::AccessRevoked,
            Self::MissingResourceId(_) => SyncErrorCategory::Internal,
            Self::StopFailed { source, .. } => {
                if source.is_transient() {
                    SyncErrorCategory::Transient
                } else {
                    SyncErrorCategory::Internal
                }
            }
            Self::Provider(source) => match source {
                ProviderError::AccessRevoked(_) => SyncErrorCategory::AccessRevoked,
                ProviderError::NotFound(_) => SyncErrorCategory::NotFound,
                p if p.is_transient() => SyncErrorCategory::Transient,
                _ => SyncErrorCategory::Internal,
            },
            Self::Domain(source) => match source {
                MeridianError::Database(_) => SyncErrorCategory::Storage,
                MeridianError::NotFound(_) => SyncErrorCategory::NotFound,
                MeridianError::AccessRevoked(_) => SyncErrorCategory::AccessRevoked,
                MeridianError::Transient(_) => SyncErrorCategory::Transient,
                _ => SyncErrorCategory::Internal,
            },
        }
    }

    /// Check if this error should be retried
    pub fn should_retry(&self) -> bool {
        self.category() == SyncErrorCategory::Transient
    }
}

impl From<SyncError> for MeridianError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::WatchAlreadyExists { user_id, calendar_id } => Self::Validation(format!(
                "watch already exists for user {user_id} on calendar {calendar_id}"
            )),
            SyncError::MissingResourceId(calendar_id) => Self::Inconsistency(format!(
                "watch response missing resource id for calendar {calendar_id}"
            )),
            SyncError::ChannelDoesNotExist(channel_id) => {
                Self::ChannelStale(format!("channel {channel_id} does not exist remotely"))
            }
            SyncError::NoActiveWatches(user_id) => {
                Self::NotFound(format!("no active watches for user {user_id}"))
            }
            SyncError::UnknownChannel(resource_id) => {
                Self::NotFound(format!("no channel matches resource id {resource_id}"))
            }
            SyncError::AccessRevoked(user_id) => {
                Self::AccessRevoked(format!("remote access revoked for user {user_id}"))
            }
            SyncError::StopFailed { source, .. } => source.into(),
            SyncError::Provider(source) => source.into(),
            SyncError::Domain(source) => source,
        }
    }
}
