//! SQLite-backed implementation of the SyncRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_core::SyncRepository;
use meridian_domain::{ChannelState, Result, SyncRecord};
use rusqlite::{Row, ToSql};
use tracing::{debug, instrument};

use super::pool::SqlitePool;
use crate::errors::InfraError;

const CHANNEL_COLUMNS: &str =
    "user_id, calendar_id, channel_id, resource_id, expiration, sync_token, refreshed_at";

/// SQLite implementation of SyncRepository
pub struct SqliteSyncRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteSyncRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn ensure_record(&self, conn: &rusqlite::Connection, user_id: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO sync_records (user_id, calendar_list_token, updated_at)
             VALUES (?1, NULL, ?2)
             ON CONFLICT(user_id) DO NOTHING",
            [&user_id as &dyn ToSql, &Utc::now().timestamp()].as_ref(),
        )
        .map_err(InfraError::from)?;
        Ok(())
    }
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<(String, ChannelState)> {
    let user_id: String = row.get(0)?;
    let expiration: i64 = row.get(4)?;
    let refreshed_at: Option<i64> = row.get(6)?;
    Ok((
        user_id,
        ChannelState {
            calendar_id: row.get(1)?,
            channel_id: row.get(2)?,
            resource_id: row.get(3)?,
            expiration: ts_to_datetime(expiration),
            sync_token: row.get(5)?,
            refreshed_at: refreshed_at.map(ts_to_datetime),
        },
    ))
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

#[async_trait]
impl SyncRepository for SqliteSyncRepository {
    #[instrument(skip(self))]
    async fn get_sync_record(&self, user_id: &str) -> Result<Option<SyncRecord>> {
        let conn = self.pool.get().map_err(InfraError::from)?;

        let calendar_list_token: Option<Option<String>> = conn
            .query_row(
                "SELECT calendar_list_token FROM sync_records WHERE user_id = ?1",
                [&user_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(InfraError::from(other)),
            })?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CHANNEL_COLUMNS} FROM watch_channels
                 WHERE user_id = ?1 ORDER BY calendar_id"
            ))
            .map_err(InfraError::from)?;
        let channels = stmt
            .query_map([&user_id], |row| channel_from_row(row).map(|(_, c)| c))
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        match calendar_list_token {
            None if channels.is_empty() => Ok(None),
            token => Ok(Some(SyncRecord {
                user_id: user_id.to_string(),
                calendar_list_token: token.flatten(),
                event_channels: channels,
            })),
        }
    }

    #[instrument(skip(self))]
    async fn find_channel_by_resource_id(
        &self,
        resource_id: &str,
    ) -> Result<Option<(String, ChannelState)>> {
        let conn = self.pool.get().map_err(InfraError::from)?;

        let result = conn.query_row(
            &format!(
                "SELECT {CHANNEL_COLUMNS} FROM watch_channels
                 WHERE resource_id = ?1 LIMIT 1"
            ),
            [&resource_id],
            channel_from_row,
        );

        match result {
            Ok(found) => Ok(Some(found)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(InfraError::from(e).into()),
        }
    }

    #[instrument(skip(self, channel), fields(calendar_id = %channel.calendar_id))]
    async fn insert_channel(&self, user_id: &str, channel: &ChannelState) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        self.ensure_record(&conn, user_id)?;

        conn.execute(
            "INSERT INTO watch_channels (
                user_id, calendar_id, channel_id, resource_id,
                expiration, sync_token, refreshed_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            [
                &user_id as &dyn ToSql,
                &channel.calendar_id,
                &channel.channel_id,
                &channel.resource_id,
                &channel.expiration.timestamp(),
                &channel.sync_token,
                &channel.refreshed_at.map(|t| t.timestamp()),
                &Utc::now().timestamp(),
            ]
            .as_ref(),
        )
        .map_err(InfraError::from)?;

        debug!(channel_id = %channel.channel_id, "inserted watch channel");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_channel(&self, user_id: &str, channel_id: &str) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let deleted = conn
            .execute(
                "DELETE FROM watch_channels WHERE user_id = ?1 AND channel_id = ?2",
                [&user_id, &channel_id],
            )
            .map_err(InfraError::from)?;
        debug!(deleted, "deleted watch channel");
        Ok(())
    }

    #[instrument(skip(self, sync_token))]
    async fn update_sync_token(
        &self,
        user_id: &str,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let updated = conn
            .execute(
                "UPDATE watch_channels SET sync_token = ?1
                 WHERE user_id = ?2 AND calendar_id = ?3",
                [&sync_token as &dyn ToSql, &user_id, &calendar_id].as_ref(),
            )
            .map_err(InfraError::from)?;
        if updated == 0 {
            // No channel for this calendar; without a stored token the next
            // import is full anyway.
            debug!(user_id, calendar_id, "no channel to store sync token on");
        }
        Ok(())
    }

    #[instrument(skip(self, sync_token))]
    async fn update_calendar_list_token(&self, user_id: &str, sync_token: &str) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        self.ensure_record(&conn, user_id)?;
        conn.execute(
            "UPDATE sync_records SET calendar_list_token = ?1, updated_at = ?2
             WHERE user_id = ?3",
            [&sync_token as &dyn ToSql, &Utc::now().timestamp(), &user_id].as_ref(),
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_refreshed_at(
        &self,
        user_id: &str,
        calendar_id: &str,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.execute(
            "UPDATE watch_channels SET refreshed_at = ?1
             WHERE user_id = ?2 AND calendar_id = ?3",
            [&refreshed_at.timestamp() as &dyn ToSql, &user_id, &calendar_id].as_ref(),
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn expiring_channels(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<(String, ChannelState)>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CHANNEL_COLUMNS} FROM watch_channels
                 WHERE expiration < ?1 ORDER BY expiration"
            ))
            .map_err(InfraError::from)?;
        let channels = stmt
            .query_map([&before.timestamp()], channel_from_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        Ok(channels)
    }

    #[instrument(skip(self))]
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let channels = conn
            .execute("DELETE FROM watch_channels WHERE user_id = ?1", [&user_id])
            .map_err(InfraError::from)?;
        let records = conn
            .execute("DELETE FROM sync_records WHERE user_id = ?1", [&user_id])
            .map_err(InfraError::from)?;
        debug!(channels, records, "deleted all sync state for user");
        Ok(())
    }
}
