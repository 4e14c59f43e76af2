//! Event endpoints

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::api::AppState;
use crate::types::{Event, EventType, EventValue, ValidationError};
use crate::utils::{elapsed_millis, now_millis};

/// Candidate event payload from the wire. Identifier and timestamp may be
/// omitted; they default to a fresh uuid and "now".
#[derive(Debug, Deserialize)]
pub struct NewEventRequest {
    pub uuid: Option<Uuid>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub value: String,
    #[serde(rename = "epochMillis")]
    pub epoch_millis: Option<i64>,
}

impl NewEventRequest {
    /// Validate the payload into an [`Event`].
    fn into_event(self) -> Result<Event, ValidationError> {
        Event::new(
            self.uuid.unwrap_or_else(Uuid::new_v4),
            EventType::new(self.event_type)?,
            EventValue::new(self.value)?,
            self.epoch_millis.unwrap_or_else(now_millis),
        )
    }
}

/// GET /events - Latest event for each type
pub async fn latest_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start = Instant::now();
    let events = state.service.latest_events();
    info!(size = events.len(), duration = elapsed_millis(start), "latest_events");
    Json(events)
}

/// GET /events/:type - All events for a type
pub async fn all_events(
    State(state): State<Arc<AppState>>,
    Path(event_type): Path<String>,
) -> impl IntoResponse {
    let start = Instant::now();
    let events = state.service.find_events(&event_type);
    info!(
        %event_type,
        size = events.len(),
        duration = elapsed_millis(start),
        "all_events"
    );
    Json(events)
}

/// GET /events/:type/latest - Latest event for a type, 404 if none
pub async fn latest_event(
    State(state): State<Arc<AppState>>,
    Path(event_type): Path<String>,
) -> impl IntoResponse {
    let start = Instant::now();
    let event = state.service.latest_event(&event_type);
    info!(
        %event_type,
        found = event.is_some(),
        duration = elapsed_millis(start),
        "latest_event"
    );
    match event {
        Some(event) => (StatusCode::OK, Json(event)).into_response(),
        None => {
            let error = ApiError::not_found(format!("no events of type '{}'", event_type));
            (StatusCode::NOT_FOUND, Json(error)).into_response()
        }
    }
}

/// GET /events/:type/count - Event count for a type
pub async fn count_events(
    State(state): State<Arc<AppState>>,
    Path(event_type): Path<String>,
) -> impl IntoResponse {
    let start = Instant::now();
    let count = state.service.count_events(&event_type);
    info!(%event_type, duration = elapsed_millis(start), "count_events");
    match count {
        Some(count) => (StatusCode::OK, Json(count)).into_response(),
        None => {
            let error = ApiError::internal("event count could not be determined");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
        }
    }
}

/// GET /events/:type/earliest/:earliest - Events from `earliest` to now
pub async fn events_since(
    State(state): State<Arc<AppState>>,
    Path((event_type, earliest)): Path<(String, i64)>,
) -> impl IntoResponse {
    // "Now" is resolved here, once per request.
    let latest = now_millis();
    range_response(&state, &event_type, earliest, latest)
}

/// GET /events/:type/earliest/:earliest/latest/:latest - Bounded range
pub async fn events_in_range(
    State(state): State<Arc<AppState>>,
    Path((event_type, earliest, latest)): Path<(String, i64, i64)>,
) -> impl IntoResponse {
    range_response(&state, &event_type, earliest, latest)
}

fn range_response(
    state: &AppState,
    event_type: &str,
    earliest: i64,
    latest: i64,
) -> Json<Vec<Event>> {
    let start = Instant::now();
    let events = state.service.find_events_in_range(event_type, earliest, latest);
    info!(
        %event_type,
        earliest,
        latest,
        size = events.len(),
        duration = elapsed_millis(start),
        "events_in_range"
    );
    Json(events)
}

/// GET /types - Distinct event type names
pub async fn all_event_types(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start = Instant::now();
    let types = state.service.all_event_types();
    info!(size = types.len(), duration = elapsed_millis(start), "all_event_types");
    Json(types)
}

/// POST /events - Add an event
///
/// 201 with a Location header when stored; 400 for payloads that fail
/// validation, match the invalid sentinel, or are refused by the store.
pub async fn add_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewEventRequest>,
) -> impl IntoResponse {
    let start = Instant::now();
    let event = match payload.into_event() {
        Ok(event) => event,
        Err(e) => {
            info!(error = %e, duration = elapsed_millis(start), "add_event rejected");
            let error = ApiError::bad_request(e.to_string());
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    if event.is_invalid() {
        let error = ApiError::bad_request("sentinel invalid event rejected");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    }

    let was_added = state.service.add_event(&event);
    info!(event = %event, was_added, duration = elapsed_millis(start), "add_event");
    if was_added {
        // Percent-encode: a stored type may contain characters that are
        // illegal in a header value.
        let location = format!(
            "/events/{}/",
            urlencoding::encode(event.event_type.as_str())
        );
        (
            StatusCode::CREATED,
            [(header::LOCATION, location)],
            Json(event),
        )
            .into_response()
    } else {
        let error = ApiError::bad_request("event was not added");
        (StatusCode::BAD_REQUEST, Json(error)).into_response()
    }
}
