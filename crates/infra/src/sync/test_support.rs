//! In-memory mock implementations of the engine's ports, shared by the sync
//! module tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_core::{
    CalendarApi, CalendarApiFactory, CalendarListPage, EventPage, EventRepository,
    ListEventsRequest, ProviderError, RemoteEvent, RemoteEventPatch, SyncRepository, WatchHandle,
};
use meridian_domain::{ChannelState, Event, MeridianError, Result, SyncRecord};
use tokio::sync::Mutex as TokioMutex;

type ListQueue = HashMap<String, VecDeque<std::result::Result<EventPage, ProviderError>>>;

/// Programmable calendar service double.
pub(crate) struct MockCalendarApi {
    list_responses: TokioMutex<ListQueue>,
    watch_responses: TokioMutex<VecDeque<std::result::Result<WatchHandle, ProviderError>>>,
    stop_responses: TokioMutex<VecDeque<std::result::Result<(), ProviderError>>>,
    calendar_list: TokioMutex<CalendarListPage>,
    pub list_calls: TokioMutex<Vec<(String, ListEventsRequest)>>,
    pub watch_calls: TokioMutex<Vec<(String, String)>>,
    pub stop_calls: TokioMutex<Vec<(String, String)>>,
}

impl MockCalendarApi {
    pub fn new() -> Self {
        Self {
            list_responses: TokioMutex::new(HashMap::new()),
            watch_responses: TokioMutex::new(VecDeque::new()),
            stop_responses: TokioMutex::new(VecDeque::new()),
            calendar_list: TokioMutex::new(CalendarListPage::default()),
            list_calls: TokioMutex::new(Vec::new()),
            watch_calls: TokioMutex::new(Vec::new()),
            stop_calls: TokioMutex::new(Vec::new()),
        }
    }

    pub async fn push_list(
        &self,
        calendar_id: &str,
        response: std::result::Result<EventPage, ProviderError>,
    ) {
        self.list_responses
            .lock()
            .await
            .entry(calendar_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub async fn push_watch(&self, response: std::result::Result<WatchHandle, ProviderError>) {
        self.watch_responses.lock().await.push_back(response);
    }

    pub async fn push_stop(&self, response: std::result::Result<(), ProviderError>) {
        self.stop_responses.lock().await.push_back(response);
    }

    pub async fn set_calendar_list(&self, page: CalendarListPage) {
        *self.calendar_list.lock().await = page;
    }
}

#[async_trait]
impl CalendarApi for MockCalendarApi {
    async fn list_calendars(&self) -> std::result::Result<CalendarListPage, ProviderError> {
        Ok(self.calendar_list.lock().await.clone())
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> std::result::Result<EventPage, ProviderError> {
        self.list_calls.lock().await.push((calendar_id.to_string(), request));
        self.list_responses
            .lock()
            .await
            .get_mut(calendar_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(EventPage::default()))
    }

    async fn watch_events(
        &self,
        calendar_id: &str,
        channel_id: &str,
        _expiration: DateTime<Utc>,
    ) -> std::result::Result<WatchHandle, ProviderError> {
        self.watch_calls.lock().await.push((calendar_id.to_string(), channel_id.to_string()));
        self.watch_responses.lock().await.pop_front().unwrap_or_else(|| {
            Ok(WatchHandle {
                resource_id: Some(format!("res-{calendar_id}")),
                expiration: None,
            })
        })
    }

    async fn stop_channel(
        &self,
        channel_id: &str,
        resource_id: &str,
    ) -> std::result::Result<(), ProviderError> {
        self.stop_calls.lock().await.push((channel_id.to_string(), resource_id.to_string()));
        self.stop_responses.lock().await.pop_front().unwrap_or(Ok(()))
    }

    async fn create_event(
        &self,
        _calendar_id: &str,
        _event: &RemoteEventPatch,
    ) -> std::result::Result<RemoteEvent, ProviderError> {
        Ok(RemoteEvent { id: Some("g-created".to_string()), ..RemoteEvent::default() })
    }

    async fn update_event(
        &self,
        _calendar_id: &str,
        remote_id: &str,
        _event: &RemoteEventPatch,
    ) -> std::result::Result<RemoteEvent, ProviderError> {
        Ok(RemoteEvent { id: Some(remote_id.to_string()), ..RemoteEvent::default() })
    }

    async fn delete_event(
        &self,
        _calendar_id: &str,
        _remote_id: &str,
    ) -> std::result::Result<(), ProviderError> {
        Ok(())
    }
}

pub(crate) struct MockFactory {
    pub api: Arc<MockCalendarApi>,
}

#[async_trait]
impl CalendarApiFactory for MockFactory {
    async fn api_for_user(&self, _user_id: &str) -> Result<Arc<dyn CalendarApi>> {
        Ok(self.api.clone())
    }
}

#[derive(Default)]
struct UserSyncState {
    calendar_list_token: Option<String>,
    channels: Vec<ChannelState>,
}

/// In-memory sync store mirroring the SQLite repository's semantics,
/// including the one-channel-per-calendar uniqueness backstop.
#[derive(Default)]
pub(crate) struct MockSyncRepository {
    state: TokioMutex<HashMap<String, UserSyncState>>,
}

impl MockSyncRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn channels(&self, user_id: &str) -> Vec<ChannelState> {
        self.state
            .lock()
            .await
            .get(user_id)
            .map(|s| s.channels.clone())
            .unwrap_or_default()
    }

    pub async fn has_state(&self, user_id: &str) -> bool {
        self.state.lock().await.contains_key(user_id)
    }

    pub async fn calendar_list_token(&self, user_id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .get(user_id)
            .and_then(|s| s.calendar_list_token.clone())
    }
}

#[async_trait]
impl SyncRepository for MockSyncRepository {
    async fn get_sync_record(&self, user_id: &str) -> Result<Option<SyncRecord>> {
        Ok(self.state.lock().await.get(user_id).map(|s| SyncRecord {
            user_id: user_id.to_string(),
            calendar_list_token: s.calendar_list_token.clone(),
            event_channels: s.channels.clone(),
        }))
    }

    async fn find_channel_by_resource_id(
        &self,
        resource_id: &str,
    ) -> Result<Option<(String, ChannelState)>> {
        let state = self.state.lock().await;
        for (user_id, user_state) in state.iter() {
            if let Some(channel) =
                user_state.channels.iter().find(|c| c.resource_id == resource_id)
            {
                return Ok(Some((user_id.clone(), channel.clone())));
            }
        }
        Ok(None)
    }

    async fn insert_channel(&self, user_id: &str, channel: &ChannelState) -> Result<()> {
        let mut state = self.state.lock().await;
        let user_state = state.entry(user_id.to_string()).or_default();
        if user_state.channels.iter().any(|c| c.calendar_id == channel.calendar_id) {
            return Err(MeridianError::Database("constraint violation: UNIQUE".to_string()));
        }
        user_state.channels.push(channel.clone());
        Ok(())
    }

    async fn delete_channel(&self, user_id: &str, channel_id: &str) -> Result<()> {
        if let Some(user_state) = self.state.lock().await.get_mut(user_id) {
            user_state.channels.retain(|c| c.channel_id != channel_id);
        }
        Ok(())
    }

    async fn update_sync_token(
        &self,
        user_id: &str,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<()> {
        if let Some(user_state) = self.state.lock().await.get_mut(user_id) {
            if let Some(channel) =
                user_state.channels.iter_mut().find(|c| c.calendar_id == calendar_id)
            {
                channel.sync_token = sync_token.map(str::to_string);
            }
        }
        Ok(())
    }

    async fn update_calendar_list_token(&self, user_id: &str, sync_token: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let user_state = state.entry(user_id.to_string()).or_default();
        user_state.calendar_list_token = Some(sync_token.to_string());
        Ok(())
    }

    async fn update_refreshed_at(
        &self,
        user_id: &str,
        calendar_id: &str,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(user_state) = self.state.lock().await.get_mut(user_id) {
            if let Some(channel) =
                user_state.channels.iter_mut().find(|c| c.calendar_id == calendar_id)
            {
                channel.refreshed_at = Some(refreshed_at);
            }
        }
        Ok(())
    }

    async fn expiring_channels(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<(String, ChannelState)>> {
        let state = self.state.lock().await;
        let mut expiring = Vec::new();
        for (user_id, user_state) in state.iter() {
            for channel in &user_state.channels {
                if channel.expiration < before {
                    expiring.push((user_id.clone(), channel.clone()));
                }
            }
        }
        Ok(expiring)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<()> {
        self.state.lock().await.remove(user_id);
        Ok(())
    }
}

/// In-memory event mirror with upsert-by-remote-id semantics.
#[derive(Default)]
pub(crate) struct MockEventRepository {
    pub events: TokioMutex<Vec<Event>>,
}

impl MockEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stored(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    pub async fn remote_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> =
            self.events.lock().await.iter().filter_map(|e| e.remote_id.clone()).collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl EventRepository for MockEventRepository {
    async fn insert(&self, event: &Event) -> Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn insert_many(&self, events: &[Event]) -> Result<usize> {
        for event in events {
            self.upsert_by_remote_id(event).await?;
        }
        Ok(events.len())
    }

    async fn upsert_by_remote_id(&self, event: &Event) -> Result<()> {
        let mut events = self.events.lock().await;
        match events.iter_mut().find(|e| {
            e.user_id == event.user_id && e.remote_id.is_some() && e.remote_id == event.remote_id
        }) {
            Some(existing) => {
                // Mirrored fields change; local-only fields stay.
                existing.title = event.title.clone();
                existing.description = event.description.clone();
                existing.start = event.start;
                existing.end = event.end;
                existing.is_all_day = event.is_all_day;
                existing.updated_at = event.updated_at;
            }
            None => events.push(event.clone()),
        }
        Ok(())
    }

    async fn delete_by_remote_id(&self, user_id: &str, remote_id: &str) -> Result<usize> {
        let mut events = self.events.lock().await;
        let before = events.len();
        events.retain(|e| !(e.user_id == user_id && e.remote_id.as_deref() == Some(remote_id)));
        Ok(before - events.len())
    }

    async fn find_by_id(&self, user_id: &str, event_id: &str) -> Result<Option<Event>> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .find(|e| e.id == event_id && e.user_id == user_id)
            .cloned())
    }

    async fn find_all_for_user(&self, user_id: &str) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    async fn replace_by_id(&self, user_id: &str, event_id: &str, event: &Event) -> Result<Event> {
        let mut events = self.events.lock().await;
        let slot = events
            .iter_mut()
            .find(|e| e.id == event_id && e.user_id == user_id)
            .ok_or_else(|| MeridianError::NotFound(format!("event {event_id}")))?;
        *slot = event.clone();
        Ok(slot.clone())
    }

    async fn delete_by_id(&self, user_id: &str, event_id: &str) -> Result<()> {
        let mut events = self.events.lock().await;
        events.retain(|e| !(e.id == event_id && e.user_id == user_id));
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        let mut events = self.events.lock().await;
        let before = events.len();
        events.retain(|e| e.user_id != user_id);
        Ok(before - events.len())
    }
}

/// A live remote event for list responses.
pub(crate) fn remote_event(id: &str, title: &str) -> RemoteEvent {
    RemoteEvent {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        description: None,
        start: Some("2025-03-01T09:00:00Z".to_string()),
        end: Some("2025-03-01T10:00:00Z".to_string()),
        is_all_day: false,
        cancelled: false,
    }
}

/// A cancelled remote event (tombstone shape: id only).
pub(crate) fn cancelled_event(id: &str) -> RemoteEvent {
    RemoteEvent { id: Some(id.to_string()), cancelled: true, ..RemoteEvent::default() }
}

pub(crate) fn channel(calendar_id: &str, sync_token: Option<&str>) -> ChannelState {
    ChannelState {
        calendar_id: calendar_id.to_string(),
        channel_id: format!("chan-{calendar_id}"),
        resource_id: format!("res-{calendar_id}"),
        expiration: Utc::now() + chrono::Duration::days(7),
        sync_token: sync_token.map(str::to_string),
        refreshed_at: None,
    }
}
