//! # Meridian Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite-backed repositories for sync state and the event mirror
//! - The Google Calendar client
//! - The sync engine (watch channels, imports, notification routing)
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `meridian-core`
//! - Depends on `meridian-domain` and `meridian-core`
//! - Contains all "impure" code (I/O, HTTP, database)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod sync;

// Re-export commonly used items
pub use database::{create_pool, init_schema, SqliteEventRepository, SqlitePool, SqliteSyncRepository};
pub use integrations::gcal::GcalClient;
pub use sync::{
    ChannelRefreshWorker, ImportEngine, NotificationRouter, RefreshWorkerConfig, SyncError,
    WatchChannelManager,
};
