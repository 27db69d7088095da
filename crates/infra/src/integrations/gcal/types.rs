//! Google Calendar wire types

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct EventsResponse {
    #[serde(default)]
    pub items: Vec<GcalEvent>,
    #[serde(rename = "nextSyncToken")]
    pub next_sync_token: Option<String>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GcalEvent {
    pub id: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<GcalEventDateTime>,
    pub end: Option<GcalEventDateTime>,
}

/// Either `dateTime` (timed event) or `date` (all-day event) is set.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GcalEventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WatchRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub address: String,
    /// Epoch milliseconds, as a string per the API.
    pub expiration: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelResponse {
    #[serde(rename = "resourceId")]
    pub resource_id: Option<String>,
    /// Epoch milliseconds, as a string.
    pub expiration: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StopChannelRequest {
    pub id: String,
    #[serde(rename = "resourceId")]
    pub resource_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    #[serde(rename = "nextSyncToken")]
    pub next_sync_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarListEntry {
    pub id: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct EventWrite {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: GcalEventDateTime,
    pub end: GcalEventDateTime,
}
