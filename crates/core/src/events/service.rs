//! Event service: local mutations with remote-first propagation

use std::sync::Arc;

use meridian_domain::constants::PRIMARY_CALENDAR_ID;
use meridian_domain::{Event, EventDraft, MeridianError, Result};
use tracing::{debug, error, instrument};

use super::plan::{plan_create, plan_delete, plan_update, RemoteStep};
use crate::calendar_ports::{CalendarApiFactory, RemoteEventPatch};
use crate::sync::ports::EventRepository;

/// Service applying user mutations to the event mirror and, for non-someday
/// events, to the remote calendar first.
pub struct EventService {
    api_factory: Arc<dyn CalendarApiFactory>,
    events: Arc<dyn EventRepository>,
}

impl EventService {
    pub fn new(api_factory: Arc<dyn CalendarApiFactory>, events: Arc<dyn EventRepository>) -> Self {
        Self { api_factory, events }
    }

    #[instrument(skip(self, draft), fields(user_id))]
    pub async fn create(&self, user_id: &str, draft: EventDraft) -> Result<Event> {
        let mut event = Event::from_draft(user_id, draft);

        let step = plan_create(&event);
        let pushed_remotely = step != RemoteStep::Skip;
        if let Some(remote_id) = self.run_remote_step(user_id, &event, &step).await? {
            event.remote_id = Some(remote_id);
        }

        match self.events.insert(&event).await {
            Ok(()) => {
                debug!(event_id = %event.id, "event created");
                Ok(event)
            }
            Err(e) if pushed_remotely => {
                // The remote side now holds an event the mirror does not.
                error!(
                    event_id = %event.id,
                    remote_id = ?event.remote_id,
                    error = %e,
                    "local insert failed after remote create; manual reconciliation required"
                );
                Err(MeridianError::Inconsistency(format!(
                    "event {} created remotely but not persisted locally: {e}",
                    event.id
                )))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, event), fields(user_id, event_id))]
    pub async fn update(&self, user_id: &str, event_id: &str, mut event: Event) -> Result<Event> {
        let step = plan_update(&event);
        if let Some(remote_id) = self.run_remote_step(user_id, &event, &step).await? {
            event.remote_id = Some(remote_id);
        }

        // A prior promotion that never attached a remote id would otherwise
        // slip through here as a silently unsynced event.
        if !event.is_someday && event.remote_id.is_none() {
            return Err(MeridianError::Inconsistency(format!(
                "event {event_id} has no remote id after remote step; prior promotion failed"
            )));
        }

        self.events.replace_by_id(user_id, event_id, &event).await
    }

    #[instrument(skip(self), fields(user_id, event_id))]
    pub async fn delete(&self, user_id: &str, event_id: &str) -> Result<()> {
        let event = self
            .events
            .find_by_id(user_id, event_id)
            .await?
            .ok_or_else(|| MeridianError::NotFound(format!("event {event_id}")))?;

        let step = plan_delete(&event)?;
        self.run_remote_step(user_id, &event, &step).await?;

        self.events.delete_by_id(user_id, event_id).await
    }

    pub async fn read(&self, user_id: &str, event_id: &str) -> Result<Event> {
        self.events
            .find_by_id(user_id, event_id)
            .await?
            .ok_or_else(|| MeridianError::NotFound(format!("event {event_id}")))
    }

    /// The user's events, ordered by start time.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Event>> {
        self.events.find_all_for_user(user_id).await
    }

    /// Wipe the user's local mirror. Their remote calendar is never touched.
    #[instrument(skip(self), fields(user_id))]
    pub async fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        self.events.delete_all_for_user(user_id).await
    }

    /// Execute the planned remote step. Returns the remote id to attach when
    /// the step created a remote counterpart.
    async fn run_remote_step(
        &self,
        user_id: &str,
        event: &Event,
        step: &RemoteStep,
    ) -> Result<Option<String>> {
        match step {
            RemoteStep::Skip => Ok(None),
            RemoteStep::Create => {
                let api = self.api_factory.api_for_user(user_id).await?;
                let created = api.create_event(PRIMARY_CALENDAR_ID, &to_patch(event)).await?;
                let remote_id = created.id.ok_or_else(|| {
                    MeridianError::Inconsistency(
                        "remote create returned an event without an id".to_string(),
                    )
                })?;
                Ok(Some(remote_id))
            }
            RemoteStep::Update { remote_id } => {
                let api = self.api_factory.api_for_user(user_id).await?;
                api.update_event(PRIMARY_CALENDAR_ID, remote_id, &to_patch(event)).await?;
                Ok(None)
            }
            RemoteStep::Delete { remote_id } => {
                let api = self.api_factory.api_for_user(user_id).await?;
                api.delete_event(PRIMARY_CALENDAR_ID, remote_id).await?;
                Ok(None)
            }
        }
    }
}

fn to_patch(event: &Event) -> RemoteEventPatch {
    RemoteEventPatch {
        title: event.title.clone(),
        description: event.description.clone(),
        start: event.start,
        end: event.end,
        is_all_day: event.is_all_day,
    }
}
