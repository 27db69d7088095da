//! Calendar sync engine
//!
//! Keeps the local event mirror consistent with the remote calendar
//! service: watch-channel lifecycle, full and incremental imports driven by
//! sync tokens, push-notification routing, and background channel refresh.
//!
//! All coordination state lives in the persistent store; the engine holds no
//! shared mutable in-process state, so concurrent requests (across users or
//! calendars) interleave only at remote-service and store calls.

pub mod errors;
pub mod import;
pub mod notifications;
pub mod refresh_worker;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{SyncError, SyncErrorCategory};
pub use import::{CalendarImportOutcome, ImportEngine};
pub use notifications::{NotificationOutcome, NotificationRouter};
pub use refresh_worker::{ChannelRefreshWorker, RefreshWorkerConfig};
pub use watch::WatchChannelManager;
