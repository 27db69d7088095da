//! SQLite-backed implementation of the EventRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_core::EventRepository;
use meridian_domain::{Event, MeridianError, Priority, Result};
use rusqlite::{Row, ToSql};
use tracing::{debug, instrument, warn};

use super::pool::SqlitePool;
use crate::errors::InfraError;

const EVENT_COLUMNS: &str = "id, user_id, remote_id, title, description, start_ts, end_ts, \
                             is_all_day, priority, is_someday, updated_at";

/// SQLite implementation of EventRepository
pub struct SqliteEventRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteEventRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn write_event(&self, conn: &rusqlite::Connection, event: &Event) -> Result<()> {
        let start_ts = event.start.timestamp();
        let end_ts = event.end.timestamp();
        let updated_at = event.updated_at.timestamp();
        let priority = event.priority.as_str();
        let params = [
            &event.id as &dyn ToSql,
            &event.user_id,
            &event.remote_id,
            &event.title,
            &event.description,
            &start_ts,
            &end_ts,
            &event.is_all_day,
            &priority,
            &event.is_someday,
            &updated_at,
        ];

        let sql = if event.remote_id.is_some() {
            // Mirror rows: a re-import of the same remote event replaces the
            // mirrored fields but keeps the local-only ones.
            "INSERT INTO events (
                id, user_id, remote_id, title, description, start_ts, end_ts,
                is_all_day, priority, is_someday, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(user_id, remote_id) WHERE remote_id IS NOT NULL DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                start_ts = excluded.start_ts,
                end_ts = excluded.end_ts,
                is_all_day = excluded.is_all_day,
                updated_at = excluded.updated_at"
        } else {
            "INSERT INTO events (
                id, user_id, remote_id, title, description, start_ts, end_ts,
                is_all_day, priority, is_someday, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        };

        conn.execute(sql, params.as_ref()).map_err(InfraError::from)?;
        Ok(())
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let start_ts: i64 = row.get(5)?;
    let end_ts: i64 = row.get(6)?;
    let priority: String = row.get(8)?;
    let updated_at: i64 = row.get(10)?;
    Ok(Event {
        id: row.get(0)?,
        user_id: row.get(1)?,
        remote_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start: ts_to_datetime(start_ts),
        end: ts_to_datetime(end_ts),
        is_all_day: row.get(7)?,
        priority: Priority::parse(&priority).unwrap_or_default(),
        is_someday: row.get(9)?,
        updated_at: ts_to_datetime(updated_at),
    })
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn insert(&self, event: &Event) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        self.write_event(&conn, event)
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn insert_many(&self, events: &[Event]) -> Result<usize> {
        let conn = self.pool.get().map_err(InfraError::from)?;

        let mut saved = 0;
        for event in events {
            match self.write_event(&conn, event) {
                Ok(()) => saved += 1,
                Err(e) => {
                    // Keep going; the count tells the caller how many stuck.
                    warn!(event_id = %event.id, error = %e, "failed to save event");
                }
            }
        }

        debug!(saved, total = events.len(), "bulk insert finished");
        Ok(saved)
    }

    #[instrument(skip(self, event), fields(remote_id = ?event.remote_id))]
    async fn upsert_by_remote_id(&self, event: &Event) -> Result<()> {
        if event.remote_id.is_none() {
            return Err(MeridianError::Validation(
                "cannot upsert by remote id: event has none".to_string(),
            ));
        }
        let conn = self.pool.get().map_err(InfraError::from)?;
        self.write_event(&conn, event)
    }

    #[instrument(skip(self))]
    async fn delete_by_remote_id(&self, user_id: &str, remote_id: &str) -> Result<usize> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let deleted = conn
            .execute(
                "DELETE FROM events WHERE user_id = ?1 AND remote_id = ?2",
                [&user_id, &remote_id],
            )
            .map_err(InfraError::from)?;
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: &str, event_id: &str) -> Result<Option<Event>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let result = conn.query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND user_id = ?2"),
            [&event_id, &user_id],
            event_from_row,
        );
        match result {
            Ok(event) => Ok(Some(event)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(InfraError::from(e).into()),
        }
    }

    #[instrument(skip(self))]
    async fn find_all_for_user(&self, user_id: &str) -> Result<Vec<Event>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 ORDER BY start_ts"
            ))
            .map_err(InfraError::from)?;
        let events = stmt
            .query_map([&user_id], event_from_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        Ok(events)
    }

    #[instrument(skip(self, event))]
    async fn replace_by_id(&self, user_id: &str, event_id: &str, event: &Event) -> Result<Event> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let updated = conn
            .execute(
                "UPDATE events SET
                    remote_id = ?1, title = ?2, description = ?3, start_ts = ?4,
                    end_ts = ?5, is_all_day = ?6, priority = ?7, is_someday = ?8,
                    updated_at = ?9
                 WHERE id = ?10 AND user_id = ?11",
                [
                    &event.remote_id as &dyn ToSql,
                    &event.title,
                    &event.description,
                    &event.start.timestamp(),
                    &event.end.timestamp(),
                    &event.is_all_day,
                    &event.priority.as_str(),
                    &event.is_someday,
                    &Utc::now().timestamp(),
                    &event_id,
                    &user_id,
                ]
                .as_ref(),
            )
            .map_err(InfraError::from)?;

        if updated == 0 {
            return Err(MeridianError::NotFound(format!("event {event_id}")));
        }

        self.find_by_id(user_id, event_id)
            .await?
            .ok_or_else(|| MeridianError::NotFound(format!("event {event_id}")))
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, user_id: &str, event_id: &str) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let deleted = conn
            .execute(
                "DELETE FROM events WHERE id = ?1 AND user_id = ?2",
                [&event_id, &user_id],
            )
            .map_err(InfraError::from)?;
        if deleted == 0 {
            return Err(MeridianError::NotFound(format!("event {event_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let deleted = conn
            .execute("DELETE FROM events WHERE user_id = ?1", [&user_id])
            .map_err(InfraError::from)?;
        debug!(deleted, "deleted all events for user");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::database::pool::{create_pool, init_schema};

    fn setup() -> (SqliteEventRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = create_pool(temp_dir.path().join("test.db"), 2).unwrap();
        init_schema(&pool).unwrap();
        (SqliteEventRepository::new(pool), temp_dir)
    }

    fn event(user_id: &str, remote_id: Option<&str>) -> Event {
        Event {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            remote_id: remote_id.map(str::to_string),
            title: "Team sync".to_string(),
            description: None,
            start: Utc::now(),
            end: Utc::now() + Duration::hours(1),
            is_all_day: false,
            priority: Priority::Work,
            is_someday: false,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let (repo, _tmp) = setup();
        let e = event("u1", Some("g-1"));
        repo.insert(&e).await.unwrap();

        let found = repo.find_by_id("u1", &e.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Team sync");
        assert_eq!(found.remote_id.as_deref(), Some("g-1"));
        assert_eq!(found.priority, Priority::Work);

        // Other users cannot see it.
        assert!(repo.find_by_id("u2", &e.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn importing_the_same_remote_event_twice_keeps_one_row() {
        let (repo, _tmp) = setup();

        let first = event("u1", Some("g-dup"));
        let mut second = event("u1", Some("g-dup"));
        second.title = "Team sync (moved)".to_string();

        assert_eq!(repo.insert_many(&[first]).await.unwrap(), 1);
        assert_eq!(repo.insert_many(&[second]).await.unwrap(), 1);

        let conn = repo.pool.get().unwrap();
        let (count, title): (i64, String) = conn
            .query_row(
                "SELECT COUNT(*), MAX(title) FROM events WHERE user_id = 'u1' AND remote_id = 'g-dup'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(title, "Team sync (moved)");
    }

    #[tokio::test]
    async fn upsert_preserves_local_only_fields() {
        let (repo, _tmp) = setup();

        let mut original = event("u1", Some("g-2"));
        original.priority = Priority::Relations;
        repo.insert(&original).await.unwrap();

        // Re-import after a remote title change.
        let mut reimported = event("u1", Some("g-2"));
        reimported.title = "Dinner (rescheduled)".to_string();
        reimported.priority = Priority::Unassigned;
        repo.upsert_by_remote_id(&reimported).await.unwrap();

        let found = repo.find_by_id("u1", &original.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Dinner (rescheduled)");
        assert_eq!(found.priority, Priority::Relations);
    }

    #[tokio::test]
    async fn upsert_without_remote_id_is_rejected() {
        let (repo, _tmp) = setup();
        let err = repo.upsert_by_remote_id(&event("u1", None)).await.unwrap_err();
        assert!(matches!(err, MeridianError::Validation(_)));
    }

    #[tokio::test]
    async fn insert_many_reports_partial_success() {
        let (repo, _tmp) = setup();

        let good = event("u1", Some("g-3"));
        let mut bad = event("u1", None);
        bad.id = good.id.clone(); // primary key collision

        let saved = repo.insert_many(&[good, bad]).await.unwrap();
        assert_eq!(saved, 1);
    }

    #[tokio::test]
    async fn delete_by_remote_id_reports_rows() {
        let (repo, _tmp) = setup();
        repo.insert(&event("u1", Some("g-4"))).await.unwrap();

        assert_eq!(repo.delete_by_remote_id("u1", "g-4").await.unwrap(), 1);
        assert_eq!(repo.delete_by_remote_id("u1", "g-4").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_by_id_requires_existing_row() {
        let (repo, _tmp) = setup();
        let e = event("u1", Some("g-5"));
        repo.insert(&e).await.unwrap();

        let mut updated = e.clone();
        updated.title = "Replaced".to_string();
        let stored = repo.replace_by_id("u1", &e.id, &updated).await.unwrap();
        assert_eq!(stored.title, "Replaced");

        let err = repo.replace_by_id("u1", "missing", &updated).await.unwrap_err();
        assert!(matches!(err, MeridianError::NotFound(_)));
    }

    #[tokio::test]
    async fn someday_events_without_remote_id_may_coexist() {
        let (repo, _tmp) = setup();
        // The partial unique index only constrains rows with a remote id.
        repo.insert(&event("u1", None)).await.unwrap();
        repo.insert(&event("u1", None)).await.unwrap();

        assert_eq!(repo.delete_all_for_user("u1").await.unwrap(), 2);
    }
}
