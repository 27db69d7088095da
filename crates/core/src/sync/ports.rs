//! Port interfaces for sync state and the event mirror

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_domain::{ChannelState, Event, Result, SyncRecord};

/// Persistence for per-user sync bookkeeping (watch channels and tokens).
///
/// All coordination state lives here; the engine keeps no in-process state,
/// so multiple instances can operate against the same store.
#[async_trait]
pub trait SyncRepository: Send + Sync {
    async fn get_sync_record(&self, user_id: &str) -> Result<Option<SyncRecord>>;

    /// Reverse lookup used by notification routing: which user and channel
    /// a remote resource id belongs to.
    async fn find_channel_by_resource_id(
        &self,
        resource_id: &str,
    ) -> Result<Option<(String, ChannelState)>>;

    /// Insert a new channel. The store enforces at most one channel per
    /// user+calendar; inserting a second fails.
    async fn insert_channel(&self, user_id: &str, channel: &ChannelState) -> Result<()>;

    async fn delete_channel(&self, user_id: &str, channel_id: &str) -> Result<()>;

    /// Advance (or clear, with `None`) the events-category sync token for
    /// one calendar's channel. A no-op when the channel is gone.
    async fn update_sync_token(
        &self,
        user_id: &str,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<()>;

    /// Record the calendar-list category's sync token.
    async fn update_calendar_list_token(&self, user_id: &str, sync_token: &str) -> Result<()>;

    async fn update_refreshed_at(
        &self,
        user_id: &str,
        calendar_id: &str,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Channels whose expiration falls before the given instant, across all
    /// users, paired with their owning user id.
    async fn expiring_channels(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<(String, ChannelState)>>;

    /// Remove every piece of sync state for the user, across categories.
    /// The user's mirrored events are untouched.
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()>;
}

/// Persistence for the local event mirror.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<()>;

    /// Bulk insert, returning how many of the given events were persisted.
    /// Rows carrying a remote id replace an existing mirror of the same
    /// remote event rather than duplicating it.
    async fn insert_many(&self, events: &[Event]) -> Result<usize>;

    /// Insert or replace the mirror entry keyed by (user, remote id).
    /// Local-only fields of an existing entry are preserved.
    async fn upsert_by_remote_id(&self, event: &Event) -> Result<()>;

    /// Delete the mirror entry for a remote event. Returns how many rows
    /// went away (0 when the event was never mirrored).
    async fn delete_by_remote_id(&self, user_id: &str, remote_id: &str) -> Result<usize>;

    async fn find_by_id(&self, user_id: &str, event_id: &str) -> Result<Option<Event>>;

    /// All of the user's events, ordered by start time.
    async fn find_all_for_user(&self, user_id: &str) -> Result<Vec<Event>>;

    /// Replace an event by id+owner, returning the stored document. Fails
    /// with not-found when no such event exists.
    async fn replace_by_id(&self, user_id: &str, event_id: &str, event: &Event) -> Result<Event>;

    async fn delete_by_id(&self, user_id: &str, event_id: &str) -> Result<()>;

    /// Delete the user's local mirror only; never touches the remote
    /// calendar.
    async fn delete_all_for_user(&self, user_id: &str) -> Result<usize>;
}
