//! Domain constants

/// Title applied to remote events that arrive without a summary.
pub const UNTITLED_EVENT_TITLE: &str = "untitled";

/// Calendar id of the user's primary calendar on the remote service.
pub const PRIMARY_CALENDAR_ID: &str = "primary";

/// Notification `resourceState` value signalling that new remote data exists.
/// Anything else (notably the initial `"sync"` marker sent when a channel is
/// established) carries nothing to import.
pub const RESOURCE_STATE_EXISTS: &str = "exists";
