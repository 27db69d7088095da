//! Sync bookkeeping types: watch channels, tokens, notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::RESOURCE_STATE_EXISTS;

/// State of one push-notification channel watching a single calendar.
///
/// Created when watching starts, mutated on every incremental import (new
/// token) and on refresh (new channel identity, old channel stopped),
/// deleted when watching stops, access is revoked, or the remote reports
/// the channel gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelState {
    /// Remote calendar watched by this channel.
    pub calendar_id: String,
    /// Locally generated, globally unique channel identifier.
    pub channel_id: String,
    /// Remote identifier of the watched resource; required to stop the
    /// channel.
    pub resource_id: String,
    /// The channel is stale once this instant passes.
    pub expiration: DateTime<Utc>,
    /// Incremental import cursor. Absent means the next import is full.
    pub sync_token: Option<String>,
    /// Last successful refresh, if any.
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Per-user sync bookkeeping. One record per user; at most one channel per
/// calendar in the events category, plus a single calendar-list token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub user_id: String,
    /// Incremental cursor for the calendar-list category.
    pub calendar_list_token: Option<String>,
    /// Watch channels for the events category.
    pub event_channels: Vec<ChannelState>,
}

impl SyncRecord {
    pub fn channel_for_calendar(&self, calendar_id: &str) -> Option<&ChannelState> {
        self.event_channels.iter().find(|c| c.calendar_id == calendar_id)
    }
}

/// Outcome of a single import pass over one calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// Cursor for the next incremental import. `None` when the remote
    /// service reported the previous token expired, which forces the next
    /// pass to import fully.
    pub next_sync_token: Option<String>,
    /// Number of remote changes applied to the local mirror.
    pub imported_count: usize,
}

/// Push notification payload, as decoded by the webhook transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchNotification {
    pub channel_id: String,
    pub resource_id: String,
    pub resource_state: String,
    pub expiration: Option<String>,
}

impl WatchNotification {
    /// The first notification on a new channel only confirms the watch was
    /// established; there is nothing to import yet.
    pub fn is_initial_sync(&self) -> bool {
        self.resource_state != RESOURCE_STATE_EXISTS
    }
}
