//! Push-notification routing
//!
//! Turns a webhook payload into the right incremental import. The webhook
//! transport itself lives elsewhere; this is the domain logic that runs
//! once a notification has been decoded.

use std::sync::Arc;

use meridian_core::SyncRepository;
use meridian_domain::{ImportResult, WatchNotification};
use tracing::{debug, info, instrument, warn};

use super::errors::SyncError;
use super::import::ImportEngine;

/// What a notification led to.
#[derive(Debug, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Initial "sync established" marker; acknowledged, nothing imported.
    Ignored,
    /// Incremental import ran for the channel's calendar.
    Imported(ImportResult),
}

/// Resolves notifications to users/calendars and triggers imports.
pub struct NotificationRouter {
    sync_repo: Arc<dyn SyncRepository>,
    import_engine: Arc<ImportEngine>,
}

impl NotificationRouter {
    pub fn new(sync_repo: Arc<dyn SyncRepository>, import_engine: Arc<ImportEngine>) -> Self {
        Self { sync_repo, import_engine }
    }

    /// Handle one push notification.
    ///
    /// A notification whose resource id matches no stored channel fails with
    /// [`SyncError::UnknownChannel`]; callers drop it (and should stop the
    /// remote channel out-of-band if it keeps recurring).
    #[instrument(
        skip(self, payload),
        fields(
            channel_id = %payload.channel_id,
            resource_id = %payload.resource_id,
            resource_state = %payload.resource_state,
        )
    )]
    pub async fn handle_notification(
        &self,
        payload: &WatchNotification,
    ) -> Result<NotificationOutcome, SyncError> {
        debug!("notification received");

        if payload.is_initial_sync() {
            info!("watch channel established; nothing to import yet");
            return Ok(NotificationOutcome::Ignored);
        }

        let Some((user_id, channel)) =
            self.sync_repo.find_channel_by_resource_id(&payload.resource_id).await?
        else {
            warn!("notification for unknown channel; dropping");
            return Err(SyncError::UnknownChannel(payload.resource_id.clone()));
        };

        let result = self
            .import_engine
            .import_calendar(&user_id, &channel.calendar_id, channel.sync_token.as_deref())
            .await?;

        info!(
            user_id = %user_id,
            calendar_id = %channel.calendar_id,
            imported = result.imported_count,
            "notification handled"
        );
        Ok(NotificationOutcome::Imported(result))
    }
}
