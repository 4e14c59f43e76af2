//! Time and timestamp utilities

use std::time::Instant;

use chrono::Utc;

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Milliseconds elapsed since `start`, for request timing logs.
pub fn elapsed_millis(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
