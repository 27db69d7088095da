//! SQLite pool helpers
//!
//! Thin wrapper around an r2d2-managed rusqlite pool that converts pool and
//! SQL errors into the domain error type used by infrastructure code.

use std::path::Path;
use std::sync::Arc;

use meridian_domain::{MeridianError, Result};
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::InfraError;

/// Shared connection pool used by the repositories.
pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;

/// Create an `Arc<SqlitePool>` for the given database file using domain
/// error semantics.
pub fn create_pool<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Arc<SqlitePool>> {
    let manager = SqliteConnectionManager::file(path.as_ref())
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = r2d2::Pool::builder()
        .max_size(pool_size)
        .build(manager)
        .map_err(|e| MeridianError::Database(format!("failed to build pool: {e}")))?;
    Ok(Arc::new(pool))
}

/// Create the tables and indexes used by the repositories.
///
/// The UNIQUE constraints here are the store-level enforcement of the sync
/// invariants: one watch channel per user+calendar, one mirror entry per
/// user+remote id.
pub fn init_schema(pool: &SqlitePool) -> Result<()> {
    let conn = pool.get().map_err(InfraError::from)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sync_records (
            user_id TEXT PRIMARY KEY,
            calendar_list_token TEXT,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS watch_channels (
            user_id TEXT NOT NULL,
            calendar_id TEXT NOT NULL,
            channel_id TEXT NOT NULL UNIQUE,
            resource_id TEXT NOT NULL,
            expiration INTEGER NOT NULL,
            sync_token TEXT,
            refreshed_at INTEGER,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, calendar_id)
        );
        CREATE INDEX IF NOT EXISTS idx_watch_channels_resource
            ON watch_channels(resource_id);
        CREATE INDEX IF NOT EXISTS idx_watch_channels_expiration
            ON watch_channels(expiration);

        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            remote_id TEXT,
            title TEXT NOT NULL,
            description TEXT,
            start_ts INTEGER NOT NULL,
            end_ts INTEGER NOT NULL,
            is_all_day INTEGER NOT NULL DEFAULT 0,
            priority TEXT NOT NULL,
            is_someday INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_events_user_remote
            ON events(user_id, remote_id) WHERE remote_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_id);",
    )
    .map_err(InfraError::from)?;
    Ok(())
}
