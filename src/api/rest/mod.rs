//! REST API module for HTTP endpoints
//!
//! Endpoints mirror the event ledger's query surface:
//! - `GET  /events` - Latest event per type
//! - `POST /events` - Add an event
//! - `GET  /events/:type` - All events for a type
//! - `GET  /events/:type/latest` - Latest event for a type
//! - `GET  /events/:type/count` - Event count for a type
//! - `GET  /events/:type/earliest/:earliest` - Range [earliest, now]
//! - `GET  /events/:type/earliest/:earliest/latest/:latest` - Range [earliest, latest]
//! - `GET  /types` - Distinct type names

pub mod events;

use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "NOT_FOUND".to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "BAD_REQUEST".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "INTERNAL_ERROR".to_string(),
        }
    }
}
