//! # Meridian Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits)
//! - The remote→local event mapping
//! - The local→remote propagation service
//!
//! ## Architecture Principles
//! - Only depends on `meridian-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod calendar_ports;
pub mod events;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use calendar_ports::{
    CalendarApi, CalendarApiFactory, CalendarListPage, EventPage, ListEventsRequest,
    ProviderError, RemoteEvent, RemoteEventPatch, WatchHandle,
};
pub use events::{plan_create, plan_delete, plan_update, EventService, RemoteStep};
pub use sync::mapping::{map_remote_event, MappedRemoteEvent};
pub use sync::ports::{EventRepository, SyncRepository};
pub use sync::channel_expiration;
