//! Remote→local event mapping
//!
//! Converts raw provider events into mirror entries. A malformed remote
//! event is a per-event failure: callers skip it and keep importing.

use chrono::{DateTime, NaiveDate, Utc};
use meridian_domain::constants::UNTITLED_EVENT_TITLE;
use meridian_domain::{Event, MeridianError, Priority, Result};
use uuid::Uuid;

use crate::calendar_ports::RemoteEvent;

/// Outcome of mapping one remote event.
#[derive(Debug, Clone)]
pub enum MappedRemoteEvent {
    /// Live event to upsert into the mirror.
    Upsert(Event),
    /// Remotely cancelled; the mirror entry for this remote id goes away.
    Cancelled { remote_id: String },
}

/// Map a raw remote event into a mirror entry for `user_id`.
///
/// An event without a remote id is rejected. A missing title defaults to
/// "untitled". Cancelled events become tombstones carrying only the remote
/// id, since the provider strips their other fields.
pub fn map_remote_event(user_id: &str, remote: &RemoteEvent) -> Result<MappedRemoteEvent> {
    let remote_id = remote
        .id
        .clone()
        .ok_or_else(|| MeridianError::Validation("remote event without an id".to_string()))?;

    if remote.cancelled {
        return Ok(MappedRemoteEvent::Cancelled { remote_id });
    }

    let start = parse_remote_timestamp(remote.start.as_deref(), remote.is_all_day, "start")?;
    let end = parse_remote_timestamp(remote.end.as_deref(), remote.is_all_day, "end")?;

    let title = match remote.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => UNTITLED_EVENT_TITLE.to_string(),
    };

    Ok(MappedRemoteEvent::Upsert(Event {
        id: Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        remote_id: Some(remote_id),
        title,
        description: remote.description.clone(),
        start,
        end,
        is_all_day: remote.is_all_day,
        priority: Priority::Unassigned,
        is_someday: false,
        updated_at: Utc::now(),
    }))
}

fn parse_remote_timestamp(
    value: Option<&str>,
    is_all_day: bool,
    field: &str,
) -> Result<DateTime<Utc>> {
    let value = value
        .ok_or_else(|| MeridianError::Validation(format!("remote event missing {field}")))?;

    if is_all_day {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
            MeridianError::Validation(format!("invalid all-day {field} date '{value}': {e}"))
        })?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            MeridianError::Validation(format!("invalid all-day {field} date '{value}'"))
        })?;
        return Ok(midnight.and_utc());
    }

    // Some providers omit the timezone designator on UTC timestamps.
    let trimmed = value.trim();
    let has_explicit_timezone = trimmed.ends_with('Z')
        || trimmed
            .rfind('T')
            .is_some_and(|idx| trimmed[idx + 1..].chars().any(|c| matches!(c, '+' | '-')));
    let candidate = if has_explicit_timezone { trimmed.to_string() } else { format!("{trimmed}Z") };

    DateTime::parse_from_rfc3339(&candidate)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MeridianError::Validation(format!("invalid {field} timestamp '{value}': {e}")))
}
