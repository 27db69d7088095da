//! SQLite-backed persistence for sync state and the event mirror

pub mod event_repository;
pub mod pool;
pub mod sync_repository;

pub use event_repository::SqliteEventRepository;
pub use pool::{create_pool, init_schema, SqlitePool};
pub use sync_repository::SqliteSyncRepository;
