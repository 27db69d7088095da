//! Mirrored calendar event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority bucket a user can assign to an event. Local-only; never pushed
/// to the remote calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Unassigned,
    Work,
    #[serde(rename = "self")]
    Personal,
    Relations,
}

impl Priority {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Work => "work",
            Self::Personal => "self",
            Self::Relations => "relations",
        }
    }

    /// Inverse of [`Priority::as_str`]. Unknown values map to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unassigned" => Some(Self::Unassigned),
            "work" => Some(Self::Work),
            "self" => Some(Self::Personal),
            "relations" => Some(Self::Relations),
            _ => None,
        }
    }
}

/// A calendar event in the local store.
///
/// Invariant: a non-someday event has exactly one remote counterpart and
/// carries its id; a someday event is local-only, has no remote id, and is
/// never pushed to the remote calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Locally generated id.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Identifier of the remote counterpart, when one exists.
    pub remote_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub priority: Priority,
    /// Someday events live in the sidebar without a committed slot.
    pub is_someday: bool,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build a new local event from user input. The remote id is attached
    /// later, once (and if) the event is pushed to the remote calendar.
    pub fn from_draft(user_id: &str, draft: EventDraft) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            remote_id: None,
            title: draft.title,
            description: draft.description,
            start: draft.start,
            end: draft.end,
            is_all_day: draft.is_all_day,
            priority: draft.priority,
            is_someday: draft.is_someday,
            updated_at: Utc::now(),
        }
    }
}

/// User-supplied fields for a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_someday: bool,
}
