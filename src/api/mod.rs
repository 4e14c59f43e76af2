//! HTTP server setup with Axum

pub mod rest;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::service::EventService;
use self::rest::events;

/// Shared state handed to every handler.
pub struct AppState {
    pub service: EventService,
}

impl AppState {
    pub fn new(service: EventService) -> Self {
        Self { service }
    }
}

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Event endpoints
        .route("/events", get(events::latest_events))
        .route("/events", post(events::add_event))
        .route("/events/:type", get(events::all_events))
        .route("/events/:type/latest", get(events::latest_event))
        .route("/events/:type/count", get(events::count_events))
        .route("/events/:type/earliest/:earliest", get(events::events_since))
        .route(
            "/events/:type/earliest/:earliest/latest/:latest",
            get(events::events_in_range),
        )
        .route("/types", get(events::all_event_types))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
