//! Full and incremental event import
//!
//! Pulls remote events into the local mirror. Full imports paginate the
//! entire calendar; incremental imports replay only the changes since the
//! stored sync token, falling back to a full pass when the service reports
//! the token expired. Re-running an import is always safe: mirror writes are
//! keyed by remote id.

use std::sync::Arc;

use futures::future::join_all;
use meridian_core::{
    map_remote_event, CalendarApi, CalendarApiFactory, EventRepository, ListEventsRequest,
    MappedRemoteEvent, ProviderError, RemoteEvent, SyncRepository,
};
use meridian_domain::ImportResult;
use tracing::{debug, info, instrument, warn};

use super::errors::SyncError;

/// Outcome of one calendar's import inside a multi-calendar run. Failures
/// are collected per calendar and never abort siblings.
#[derive(Debug)]
pub struct CalendarImportOutcome {
    pub calendar_id: String,
    pub result: Result<ImportResult, SyncError>,
}

/// Imports remote events into the local mirror and advances sync tokens.
pub struct ImportEngine {
    api_factory: Arc<dyn CalendarApiFactory>,
    sync_repo: Arc<dyn SyncRepository>,
    event_repo: Arc<dyn EventRepository>,
}

impl ImportEngine {
    pub fn new(
        api_factory: Arc<dyn CalendarApiFactory>,
        sync_repo: Arc<dyn SyncRepository>,
        event_repo: Arc<dyn EventRepository>,
    ) -> Self {
        Self { api_factory, sync_repo, event_repo }
    }

    /// Import every given calendar from scratch. Calendars run concurrently;
    /// each is an independent unit of work.
    #[instrument(skip(self, calendar_ids), fields(user_id, calendars = calendar_ids.len()))]
    pub async fn import_full(
        &self,
        user_id: &str,
        calendar_ids: &[String],
    ) -> Result<Vec<CalendarImportOutcome>, SyncError> {
        let api = self.api_factory.api_for_user(user_id).await?;

        let imports = calendar_ids.iter().map(|calendar_id| {
            let api = api.clone();
            async move {
                let result = self.full_pass(user_id, api.as_ref(), calendar_id).await;
                if let Err(e) = &result {
                    warn!(calendar_id = %calendar_id, error = %e, "full import failed");
                }
                CalendarImportOutcome { calendar_id: calendar_id.clone(), result }
            }
        });

        Ok(join_all(imports).await)
    }

    /// Incrementally import every calendar the user actively watches.
    #[instrument(skip(self), fields(user_id))]
    pub async fn import_incremental(
        &self,
        user_id: &str,
    ) -> Result<Vec<CalendarImportOutcome>, SyncError> {
        let Some(record) = self.sync_repo.get_sync_record(user_id).await? else {
            debug!("user has no sync state; nothing to import");
            return Ok(Vec::new());
        };

        let api = self.api_factory.api_for_user(user_id).await?;

        let imports = record.event_channels.iter().map(|channel| {
            let api = api.clone();
            async move {
                let result = self
                    .incremental_pass(
                        user_id,
                        api.as_ref(),
                        &channel.calendar_id,
                        channel.sync_token.as_deref(),
                    )
                    .await;
                if let Err(e) = &result {
                    warn!(calendar_id = %channel.calendar_id, error = %e, "incremental import failed");
                }
                CalendarImportOutcome { calendar_id: channel.calendar_id.clone(), result }
            }
        });

        Ok(join_all(imports).await)
    }

    /// Incremental import scoped to a single calendar (the notification
    /// path).
    #[instrument(skip(self, sync_token), fields(user_id, calendar_id))]
    pub async fn import_calendar(
        &self,
        user_id: &str,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<ImportResult, SyncError> {
        let api = self.api_factory.api_for_user(user_id).await?;
        self.incremental_pass(user_id, api.as_ref(), calendar_id, sync_token).await
    }

    /// One incremental pass: changes-since-token when a token exists, full
    /// otherwise. A token the service reports expired is cleared and the
    /// pass retried as full, for this calendar only.
    async fn incremental_pass(
        &self,
        user_id: &str,
        api: &dyn CalendarApi,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<ImportResult, SyncError> {
        let Some(token) = sync_token else {
            return self.full_pass(user_id, api, calendar_id).await;
        };

        match self.changes_pass(user_id, api, calendar_id, token).await {
            Err(SyncError::Provider(ProviderError::TokenExpired(reason))) => {
                warn!(reason = %reason, "sync token expired; falling back to full import");
                self.sync_repo.update_sync_token(user_id, calendar_id, None).await?;
                self.full_pass(user_id, api, calendar_id).await
            }
            other => other,
        }
    }

    /// Fetch the whole calendar, page by page, and mirror the live events.
    async fn full_pass(
        &self,
        user_id: &str,
        api: &dyn CalendarApi,
        calendar_id: &str,
    ) -> Result<ImportResult, SyncError> {
        let mut imported = 0;
        let mut next_sync_token: Option<String> = None;
        let mut page_token: Option<String> = None;

        loop {
            let page = api
                .list_events(
                    calendar_id,
                    ListEventsRequest { sync_token: None, page_token: page_token.clone() },
                )
                .await?;

            imported += self.mirror_live_events(user_id, &page.events).await?;
            next_sync_token = page.next_sync_token.or(next_sync_token);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        if let Some(token) = next_sync_token.as_deref() {
            self.sync_repo.update_sync_token(user_id, calendar_id, Some(token)).await?;
        }

        info!(imported, "full import finished");
        Ok(ImportResult { next_sync_token, imported_count: imported })
    }

    /// Replay remote changes since `token`: cancelled events disappear from
    /// the mirror, everything else is upserted by remote id.
    async fn changes_pass(
        &self,
        user_id: &str,
        api: &dyn CalendarApi,
        calendar_id: &str,
        token: &str,
    ) -> Result<ImportResult, SyncError> {
        let mut applied = 0;
        let mut next_sync_token: Option<String> = None;
        let mut page_token: Option<String> = None;

        loop {
            let page = api
                .list_events(
                    calendar_id,
                    ListEventsRequest {
                        sync_token: Some(token.to_string()),
                        page_token: page_token.clone(),
                    },
                )
                .await?;

            applied += self.apply_changes(user_id, &page.events).await?;
            next_sync_token = page.next_sync_token.or(next_sync_token);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        match next_sync_token.as_deref() {
            Some(new_token) => {
                self.sync_repo.update_sync_token(user_id, calendar_id, Some(new_token)).await?;
            }
            None => {
                debug!("no sync token in response; leaving existing token unchanged");
            }
        }

        info!(applied, "incremental import finished");
        Ok(ImportResult { next_sync_token, imported_count: applied })
    }

    async fn mirror_live_events(
        &self,
        user_id: &str,
        events: &[RemoteEvent],
    ) -> Result<usize, SyncError> {
        let mut mapped = Vec::with_capacity(events.len());
        for remote in events {
            match map_remote_event(user_id, remote) {
                Ok(MappedRemoteEvent::Upsert(event)) => mapped.push(event),
                // Full imports mirror live events only.
                Ok(MappedRemoteEvent::Cancelled { .. }) => {}
                Err(e) => warn!(error = %e, "skipping unmappable remote event"),
            }
        }
        Ok(self.event_repo.insert_many(&mapped).await?)
    }

    async fn apply_changes(
        &self,
        user_id: &str,
        events: &[RemoteEvent],
    ) -> Result<usize, SyncError> {
        let mut applied = 0;
        for remote in events {
            match map_remote_event(user_id, remote) {
                Ok(MappedRemoteEvent::Upsert(event)) => {
                    self.event_repo.upsert_by_remote_id(&event).await?;
                    applied += 1;
                }
                Ok(MappedRemoteEvent::Cancelled { remote_id }) => {
                    let deleted = self.event_repo.delete_by_remote_id(user_id, &remote_id).await?;
                    debug!(remote_id = %remote_id, deleted, "removed cancelled event");
                    applied += 1;
                }
                Err(e) => warn!(error = %e, "skipping unmappable remote event"),
            }
        }
        Ok(applied)
    }
}
