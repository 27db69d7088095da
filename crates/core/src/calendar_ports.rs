//! Calendar service port interfaces
//!
//! The sync engine talks to the remote calendar service exclusively through
//! these traits. Implementations classify transport-specific failure shapes
//! (HTTP status codes, API error bodies) into [`ProviderError`], so nothing
//! above this seam ever inspects a status code.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_domain::{MeridianError, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy returned by every [`CalendarApi`] operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The addressed entity (event, channel, calendar) does not exist
    /// remotely.
    #[error("remote entity not found: {0}")]
    NotFound(String),

    /// The incremental sync token is no longer valid; the next import must
    /// be full.
    #[error("sync token expired: {0}")]
    TokenExpired(String),

    /// The user's grant was revoked or the account lost access.
    #[error("remote access revoked: {0}")]
    AccessRevoked(String),

    /// The service asked us to back off.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Transport-level failure (connect, TLS, timeout).
    #[error("network failure: {0}")]
    Network(String),

    /// The request was rejected as malformed.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Remote service failure (5xx-equivalent).
    #[error("service failure: {0}")]
    Service(String),
}

impl ProviderError {
    /// Errors that are safe to retry at the caller's discretion.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Network(_) | Self::Service(_))
    }
}

impl From<ProviderError> for MeridianError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => Self::NotFound(msg),
            ProviderError::TokenExpired(msg) => Self::ChannelStale(msg),
            ProviderError::AccessRevoked(msg) => Self::AccessRevoked(msg),
            ProviderError::RateLimited(msg)
            | ProviderError::Network(msg)
            | ProviderError::Service(msg) => Self::Transient(msg),
            ProviderError::Invalid(msg) => Self::Validation(msg),
        }
    }
}

/// Raw calendar event as returned by the remote service, before mapping.
///
/// Timestamps stay in the provider's string form here; parsing happens in
/// the mapping layer. Cancelled events may carry nothing but an id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub is_all_day: bool,
    pub cancelled: bool,
}

/// One page of events from the remote service.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

/// Cursor for a list call. A sync token requests only changes since that
/// token; a page token continues a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEventsRequest {
    pub sync_token: Option<String>,
    pub page_token: Option<String>,
}

/// Channel handle returned by a successful watch request.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    /// Remote identifier of the watched resource. The service may omit it;
    /// a channel without one can never be stopped, so callers must reject
    /// that case.
    pub resource_id: Option<String>,
    /// Expiration as acknowledged by the service, when provided.
    pub expiration: Option<DateTime<Utc>>,
}

/// Result of enumerating the calendars selected for sync.
#[derive(Debug, Clone, Default)]
pub struct CalendarListPage {
    pub calendar_ids: Vec<String>,
    pub next_sync_token: Option<String>,
}

/// Payload for pushing a local event to the remote service. Local-only
/// fields (priority, someday) are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEventPatch {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
}

/// Authenticated calendar-service capability for a single user.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Enumerate the calendars selected for sync, with the calendar-list
    /// category's incremental token.
    async fn list_calendars(&self) -> std::result::Result<CalendarListPage, ProviderError>;

    /// List events for one calendar, either fully (paginated) or
    /// incrementally (sync token).
    async fn list_events(
        &self,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> std::result::Result<EventPage, ProviderError>;

    /// Open a push-notification channel for a calendar's events.
    async fn watch_events(
        &self,
        calendar_id: &str,
        channel_id: &str,
        expiration: DateTime<Utc>,
    ) -> std::result::Result<WatchHandle, ProviderError>;

    /// Terminate a push-notification channel.
    async fn stop_channel(
        &self,
        channel_id: &str,
        resource_id: &str,
    ) -> std::result::Result<(), ProviderError>;

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &RemoteEventPatch,
    ) -> std::result::Result<RemoteEvent, ProviderError>;

    async fn update_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
        event: &RemoteEventPatch,
    ) -> std::result::Result<RemoteEvent, ProviderError>;

    async fn delete_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
    ) -> std::result::Result<(), ProviderError>;
}

/// Capability that resolves an authenticated [`CalendarApi`] for a user.
/// Credential storage and token refresh live behind this seam.
#[async_trait]
pub trait CalendarApiFactory: Send + Sync {
    async fn api_for_user(&self, user_id: &str) -> Result<Arc<dyn CalendarApi>>;
}
