//! Google Calendar implementation of the `CalendarApi` capability
//!
//! Classifies HTTP failures into the capability-level `ProviderError`
//! taxonomy so the sync engine never sees a status code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_core::{
    CalendarApi, CalendarListPage, EventPage, ListEventsRequest, ProviderError, RemoteEvent,
    RemoteEventPatch, WatchHandle,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;
use url::Url;

use super::types::{
    CalendarListResponse, ChannelResponse, EventWrite, EventsResponse, GcalEvent,
    GcalEventDateTime, StopChannelRequest, WatchRequest,
};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar client for one user's account.
pub struct GcalClient {
    http: Client,
    base_url: Url,
    access_token: String,
    /// Delivery address handed to the push-notification service.
    webhook_address: String,
}

impl GcalClient {
    pub fn new(access_token: String, webhook_address: String) -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_API_BASE, access_token, webhook_address)
    }

    /// Point the client at a different API base. Used by tests.
    pub fn with_base_url(
        base_url: &str,
        access_token: String,
        webhook_address: String,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::Invalid(format!("invalid API base url: {e}")))?;
        Ok(Self { http: Client::new(), base_url, access_token, webhook_address })
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!("{}/{path}", self.base_url.path().trim_end_matches('/')))
            .map_err(|e| ProviderError::Invalid(format!("invalid API path '{path}': {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

/// Map a non-success HTTP status (plus error body) to the capability
/// taxonomy.
fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        404 => ProviderError::NotFound(format!("404: {body}")),
        // Gone: the sync token (or watched resource) no longer exists.
        410 => ProviderError::TokenExpired(format!("410: {body}")),
        401 => ProviderError::AccessRevoked(format!("401: {body}")),
        403 => {
            if body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded") {
                ProviderError::RateLimited(format!("403: {body}"))
            } else {
                ProviderError::AccessRevoked(format!("403: {body}"))
            }
        }
        429 => ProviderError::RateLimited(format!("429: {body}")),
        400 => ProviderError::Invalid(format!("400: {body}")),
        500..=599 => ProviderError::Service(format!("{status}: {body}")),
        _ => ProviderError::Service(format!("unexpected status {status}: {body}")),
    }
}

fn map_event(event: GcalEvent) -> RemoteEvent {
    let is_all_day = event.start.as_ref().is_some_and(|s| s.date.is_some());
    let pick = |dt: Option<GcalEventDateTime>| dt.and_then(|dt| dt.date_time.or(dt.date));
    RemoteEvent {
        cancelled: event.status.as_deref() == Some("cancelled"),
        id: event.id,
        title: event.summary,
        description: event.description,
        start: pick(event.start),
        end: pick(event.end),
        is_all_day,
    }
}

fn to_wire(patch: &RemoteEventPatch) -> EventWrite {
    let wire_time = |t: &DateTime<Utc>| {
        if patch.is_all_day {
            GcalEventDateTime { date_time: None, date: Some(t.format("%Y-%m-%d").to_string()) }
        } else {
            GcalEventDateTime { date_time: Some(t.to_rfc3339()), date: None }
        }
    };
    EventWrite {
        summary: patch.title.clone(),
        description: patch.description.clone(),
        start: wire_time(&patch.start),
        end: wire_time(&patch.end),
    }
}

fn parse_epoch_millis(value: &str) -> Option<DateTime<Utc>> {
    value.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

#[async_trait]
impl CalendarApi for GcalClient {
    async fn list_calendars(&self) -> Result<CalendarListPage, ProviderError> {
        let url = self.url("users/me/calendarList")?;
        let response = self.send(self.http.get(url)).await?;
        let list: CalendarListResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Invalid(format!("failed to parse calendar list: {e}")))?;

        let calendar_ids = list
            .items
            .into_iter()
            .filter(|entry| entry.primary || entry.selected)
            .map(|entry| entry.id)
            .collect();

        Ok(CalendarListPage { calendar_ids, next_sync_token: list.next_sync_token })
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> Result<EventPage, ProviderError> {
        let url = self.url(&format!("calendars/{calendar_id}/events"))?;

        let mut query: Vec<(&str, String)> = vec![("singleEvents", "true".to_string())];
        if let Some(token) = &request.sync_token {
            query.push(("syncToken", token.clone()));
        }
        if let Some(token) = &request.page_token {
            query.push(("pageToken", token.clone()));
        }

        debug!(calendar_id, incremental = request.sync_token.is_some(), "listing events");

        let response = self.send(self.http.get(url).query(&query)).await?;
        let events: EventsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Invalid(format!("failed to parse events: {e}")))?;

        Ok(EventPage {
            events: events.items.into_iter().map(map_event).collect(),
            next_page_token: events.next_page_token,
            next_sync_token: events.next_sync_token,
        })
    }

    async fn watch_events(
        &self,
        calendar_id: &str,
        channel_id: &str,
        expiration: DateTime<Utc>,
    ) -> Result<WatchHandle, ProviderError> {
        let url = self.url(&format!("calendars/{calendar_id}/events/watch"))?;
        let body = WatchRequest {
            id: channel_id.to_string(),
            channel_type: "web_hook".to_string(),
            address: self.webhook_address.clone(),
            expiration: expiration.timestamp_millis().to_string(),
        };

        let response = self.send(self.http.post(url).json(&body)).await?;
        let channel: ChannelResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Invalid(format!("failed to parse watch response: {e}")))?;

        Ok(WatchHandle {
            resource_id: channel.resource_id,
            expiration: channel.expiration.as_deref().and_then(parse_epoch_millis),
        })
    }

    async fn stop_channel(
        &self,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<(), ProviderError> {
        let url = self.url("channels/stop")?;
        let body = StopChannelRequest {
            id: channel_id.to_string(),
            resource_id: resource_id.to_string(),
        };
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &RemoteEventPatch,
    ) -> Result<RemoteEvent, ProviderError> {
        let url = self.url(&format!("calendars/{calendar_id}/events"))?;
        let response = self.send(self.http.post(url).json(&to_wire(event))).await?;
        let created: GcalEvent = response
            .json()
            .await
            .map_err(|e| ProviderError::Invalid(format!("failed to parse created event: {e}")))?;
        Ok(map_event(created))
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
        event: &RemoteEventPatch,
    ) -> Result<RemoteEvent, ProviderError> {
        let url = self.url(&format!("calendars/{calendar_id}/events/{remote_id}"))?;
        let response = self.send(self.http.put(url).json(&to_wire(event))).await?;
        let updated: GcalEvent = response
            .json()
            .await
            .map_err(|e| ProviderError::Invalid(format!("failed to parse updated event: {e}")))?;
        Ok(map_event(updated))
    }

    async fn delete_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
    ) -> Result<(), ProviderError> {
        let url = self.url(&format!("calendars/{calendar_id}/events/{remote_id}"))?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client(server: &MockServer) -> GcalClient {
        GcalClient::with_base_url(
            &server.uri(),
            "token-123".to_string(),
            "https://example.com/api/sync/notifications".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn list_events_maps_items_and_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("syncToken", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "id": "g-1",
                        "status": "confirmed",
                        "summary": "Standup",
                        "start": {"dateTime": "2025-03-01T09:00:00Z"},
                        "end": {"dateTime": "2025-03-01T09:15:00Z"}
                    },
                    {"id": "g-2", "status": "cancelled"}
                ],
                "nextSyncToken": "tok-2"
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .await
            .list_events(
                "primary",
                ListEventsRequest { sync_token: Some("tok-1".to_string()), page_token: None },
            )
            .await
            .unwrap();

        assert_eq!(page.events.len(), 2);
        assert_eq!(page.events[0].title.as_deref(), Some("Standup"));
        assert!(!page.events[0].cancelled);
        assert!(page.events[1].cancelled);
        assert_eq!(page.next_sync_token.as_deref(), Some("tok-2"));
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn all_day_events_carry_the_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "g-3",
                    "summary": "Offsite",
                    "start": {"date": "2025-03-01"},
                    "end": {"date": "2025-03-02"}
                }]
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .await
            .list_events("primary", ListEventsRequest::default())
            .await
            .unwrap();

        assert!(page.events[0].is_all_day);
        assert_eq!(page.events[0].start.as_deref(), Some("2025-03-01"));
    }

    #[tokio::test]
    async fn gone_status_classifies_as_token_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(410).set_body_string("Gone"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .list_events("primary", ListEventsRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::TokenExpired(_)));
    }

    #[tokio::test]
    async fn rate_limit_shapes_classify_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"error":{"errors":[{"reason":"rateLimitExceeded"}]}}"#),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .list_events("primary", ListEventsRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn unauthorized_classifies_as_access_revoked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/stop"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let err = client(&server).await.stop_channel("c1", "r1").await.unwrap_err();
        assert!(matches!(err, ProviderError::AccessRevoked(_)));
    }

    #[tokio::test]
    async fn watch_posts_channel_and_maps_handle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events/watch"))
            .and(body_partial_json(json!({"id": "chan-1", "type": "web_hook"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resourceId": "res-1",
                "expiration": "1741000000000"
            })))
            .mount(&server)
            .await;

        let handle = client(&server)
            .await
            .watch_events("primary", "chan-1", Utc::now())
            .await
            .unwrap();
        assert_eq!(handle.resource_id.as_deref(), Some("res-1"));
        assert!(handle.expiration.is_some());
    }

    #[tokio::test]
    async fn watch_response_may_omit_resource_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let handle = client(&server)
            .await
            .watch_events("primary", "chan-1", Utc::now())
            .await
            .unwrap();
        assert!(handle.resource_id.is_none());
    }

    #[tokio::test]
    async fn calendar_list_keeps_selected_and_primary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "primary-cal", "primary": true},
                    {"id": "team-cal", "selected": true},
                    {"id": "holidays", "selected": false}
                ],
                "nextSyncToken": "list-tok"
            })))
            .mount(&server)
            .await;

        let page = client(&server).await.list_calendars().await.unwrap();
        assert_eq!(page.calendar_ids, vec!["primary-cal", "team-cal"]);
        assert_eq!(page.next_sync_token.as_deref(), Some("list-tok"));
    }

    #[tokio::test]
    async fn create_event_round_trips_remote_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(json!({"summary": "Lunch"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "g-new",
                "summary": "Lunch",
                "start": {"dateTime": "2025-03-01T12:00:00Z"},
                "end": {"dateTime": "2025-03-01T13:00:00Z"}
            })))
            .mount(&server)
            .await;

        let patch = RemoteEventPatch {
            title: "Lunch".to_string(),
            description: None,
            start: Utc::now(),
            end: Utc::now(),
            is_all_day: false,
        };
        let created = client(&server).await.create_event("primary", &patch).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("g-new"));
    }
}
