//! Watch channel lifecycle
//!
//! Opens, stops, and refreshes push-notification channels against the
//! remote calendar service, one channel per user+calendar. Channel identity
//! lives in the sync store; this manager keeps no state of its own.

use std::sync::Arc;

use chrono::Utc;
use meridian_core::{channel_expiration, CalendarApi, CalendarApiFactory, ProviderError, SyncRepository};
use meridian_domain::{ChannelState, SyncConfig};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::errors::SyncError;
use crate::errors::is_unique_violation;

/// Manages push-notification channels for the events category.
pub struct WatchChannelManager {
    api_factory: Arc<dyn CalendarApiFactory>,
    sync_repo: Arc<dyn SyncRepository>,
    config: SyncConfig,
}

impl WatchChannelManager {
    pub fn new(
        api_factory: Arc<dyn CalendarApiFactory>,
        sync_repo: Arc<dyn SyncRepository>,
        config: SyncConfig,
    ) -> Self {
        Self { api_factory, sync_repo, config }
    }

    /// Open a watch channel for one calendar. Fails when a channel already
    /// exists for this user+calendar.
    #[instrument(skip(self), fields(user_id, calendar_id))]
    pub async fn start_watching(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> Result<ChannelState, SyncError> {
        let api = self.api_factory.api_for_user(user_id).await?;
        self.start_watching_with(api.as_ref(), user_id, calendar_id).await
    }

    async fn start_watching_with(
        &self,
        api: &dyn CalendarApi,
        user_id: &str,
        calendar_id: &str,
    ) -> Result<ChannelState, SyncError> {
        if let Some(record) = self.sync_repo.get_sync_record(user_id).await? {
            if record.channel_for_calendar(calendar_id).is_some() {
                return Err(SyncError::WatchAlreadyExists {
                    user_id: user_id.to_string(),
                    calendar_id: calendar_id.to_string(),
                });
            }
        }

        let channel_id = Uuid::new_v4().to_string();
        let expiration = channel_expiration(self.config.channel_ttl_days);

        debug!(channel_id = %channel_id, "requesting watch channel");
        let handle = api.watch_events(calendar_id, &channel_id, expiration).await?;

        let resource_id = handle
            .resource_id
            .ok_or_else(|| SyncError::MissingResourceId(calendar_id.to_string()))?;

        let channel = ChannelState {
            calendar_id: calendar_id.to_string(),
            channel_id,
            resource_id,
            expiration: handle.expiration.unwrap_or(expiration),
            sync_token: None,
            refreshed_at: None,
        };

        self.sync_repo.insert_channel(user_id, &channel).await.map_err(|e| {
            if is_unique_violation(&e) {
                // A concurrent start_watching slipped past the existence
                // check; the store's uniqueness constraint is the backstop.
                SyncError::WatchAlreadyExists {
                    user_id: user_id.to_string(),
                    calendar_id: calendar_id.to_string(),
                }
            } else {
                SyncError::Domain(e)
            }
        })?;

        info!(channel_id = %channel.channel_id, "watch channel established");
        Ok(channel)
    }

    /// Open watch channels for every calendar the user syncs, recording the
    /// calendar-list token first.
    #[instrument(skip(self), fields(user_id))]
    pub async fn start_watching_all(&self, user_id: &str) -> Result<Vec<ChannelState>, SyncError> {
        let api = self.api_factory.api_for_user(user_id).await?;

        let calendars = api.list_calendars().await?;
        if let Some(token) = &calendars.next_sync_token {
            self.sync_repo.update_calendar_list_token(user_id, token).await?;
        }

        let mut channels = Vec::with_capacity(calendars.calendar_ids.len());
        for calendar_id in &calendars.calendar_ids {
            channels.push(self.start_watching_with(api.as_ref(), user_id, calendar_id).await?);
        }
        Ok(channels)
    }

    /// Stop a watch channel and delete its state.
    ///
    /// Outcomes other than success:
    /// - access revoked: every piece of the user's sync state is deleted,
    ///   then [`SyncError::AccessRevoked`] is returned;
    /// - channel unknown remotely: the local state is deleted and
    ///   [`SyncError::ChannelDoesNotExist`] reported (already resolved);
    /// - anything else: no state is mutated.
    #[instrument(skip(self), fields(user_id, channel_id))]
    pub async fn stop_watching(
        &self,
        user_id: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<(), SyncError> {
        let api = self.api_factory.api_for_user(user_id).await?;
        self.stop_watching_with(api.as_ref(), user_id, channel_id, resource_id).await
    }

    async fn stop_watching_with(
        &self,
        api: &dyn CalendarApi,
        user_id: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<(), SyncError> {
        debug!("stopping watch channel");
        match api.stop_channel(channel_id, resource_id).await {
            Ok(()) => {
                self.sync_repo.delete_channel(user_id, channel_id).await?;
                Ok(())
            }
            Err(ProviderError::AccessRevoked(reason)) => {
                warn!(reason = %reason, "access revoked; deleting all sync state for user");
                self.sync_repo.delete_all_for_user(user_id).await?;
                Err(SyncError::AccessRevoked(user_id.to_string()))
            }
            Err(ProviderError::NotFound(_)) => {
                // The remote side already forgot the channel; drop ours too.
                self.sync_repo.delete_channel(user_id, channel_id).await?;
                Err(SyncError::ChannelDoesNotExist(channel_id.to_string()))
            }
            Err(source) => {
                Err(SyncError::StopFailed { channel_id: channel_id.to_string(), source })
            }
        }
    }

    /// Stop every watch channel the user has, tolerating per-channel
    /// failures. Returns the number of channels stopped.
    #[instrument(skip(self), fields(user_id))]
    pub async fn stop_all_watching(&self, user_id: &str) -> Result<usize, SyncError> {
        let record = self
            .sync_repo
            .get_sync_record(user_id)
            .await?
            .filter(|r| !r.event_channels.is_empty())
            .ok_or_else(|| SyncError::NoActiveWatches(user_id.to_string()))?;

        let api = self.api_factory.api_for_user(user_id).await?;

        let mut stopped = 0;
        for channel in &record.event_channels {
            match self
                .stop_watching_with(api.as_ref(), user_id, &channel.channel_id, &channel.resource_id)
                .await
            {
                Ok(()) => stopped += 1,
                // Already gone remotely; local state was cleaned up.
                Err(SyncError::ChannelDoesNotExist(_)) => stopped += 1,
                // All sync state is gone; continuing is pointless.
                Err(e @ SyncError::AccessRevoked(_)) => return Err(e),
                Err(e) => {
                    warn!(channel_id = %channel.channel_id, error = %e, "failed to stop channel");
                }
            }
        }

        info!(stopped, "stopped watch channels");
        Ok(stopped)
    }

    /// Replace a channel nearing its expiration: stop the old one (ignoring
    /// already-gone outcomes), open a fresh one for the same calendar, and
    /// stamp `refreshed_at`. The sync token carries over; a refresh changes
    /// channel identity, not import progress.
    #[instrument(skip(self, channel), fields(user_id, calendar_id = %channel.calendar_id))]
    pub async fn refresh_watching(
        &self,
        user_id: &str,
        channel: &ChannelState,
    ) -> Result<ChannelState, SyncError> {
        let api = self.api_factory.api_for_user(user_id).await?;

        match self
            .stop_watching_with(api.as_ref(), user_id, &channel.channel_id, &channel.resource_id)
            .await
        {
            Ok(()) | Err(SyncError::ChannelDoesNotExist(_)) => {}
            Err(e) => return Err(e),
        }

        let mut fresh =
            self.start_watching_with(api.as_ref(), user_id, &channel.calendar_id).await?;

        if channel.sync_token.is_some() {
            self.sync_repo
                .update_sync_token(user_id, &channel.calendar_id, channel.sync_token.as_deref())
                .await?;
            fresh.sync_token = channel.sync_token.clone();
        }

        let refreshed_at = Utc::now();
        self.sync_repo.update_refreshed_at(user_id, &channel.calendar_id, refreshed_at).await?;
        fresh.refreshed_at = Some(refreshed_at);

        Ok(fresh)
    }
}
