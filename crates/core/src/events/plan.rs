//! Pure planning for local→remote propagation

use meridian_domain::{Event, MeridianError, Result};

/// Remote-side step required before a local mutation may commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStep {
    /// Someday events never touch the remote service.
    Skip,
    /// Create a remote counterpart and attach its id.
    Create,
    /// Update the existing remote counterpart.
    Update { remote_id: String },
    /// Delete the remote counterpart.
    Delete { remote_id: String },
}

pub fn plan_create(event: &Event) -> RemoteStep {
    if event.is_someday {
        RemoteStep::Skip
    } else {
        RemoteStep::Create
    }
}

/// An event just promoted out of someday has no remote id yet and is created
/// remotely; otherwise the existing remote event is updated.
pub fn plan_update(event: &Event) -> RemoteStep {
    if event.is_someday {
        return RemoteStep::Skip;
    }
    match &event.remote_id {
        Some(remote_id) => RemoteStep::Update { remote_id: remote_id.clone() },
        None => RemoteStep::Create,
    }
}

/// Deleting a non-someday event requires its remote counterpart to go first;
/// without a remote id there is nothing safe to do.
pub fn plan_delete(event: &Event) -> Result<RemoteStep> {
    if event.is_someday {
        return Ok(RemoteStep::Skip);
    }
    match &event.remote_id {
        Some(remote_id) => Ok(RemoteStep::Delete { remote_id: remote_id.clone() }),
        None => Err(MeridianError::Validation(format!(
            "event {} has no remote id; cannot delete remotely",
            event.id
        ))),
    }
}
