//! Core event domain types.
//!
//! An [`Event`] is an immutable, timestamped, typed record appended to the
//! log. Its `type` and `value` fields are validated wrapper types that can
//! only be constructed through fallible factories, so an `Event` that exists
//! is an `Event` that passed validation.

use std::fmt;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel type string carried by default-constructed (invalid) events.
pub const INVALID_TYPE: &str = "---INVALID-TYPE---";

/// Sentinel value string carried by default-constructed (invalid) events.
pub const INVALID_VALUE: &str = "---INVALID-VALUE---";

/// Validation failures raised when constructing domain values.
///
/// Raised before any storage interaction; retrying with the same input
/// will fail again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("EventType must be between {min} and {max} characters, got {actual}")]
    TypeLength { min: usize, max: usize, actual: usize },
    #[error("EventValue must be between {min} and {max} characters, got {actual}")]
    ValueLength { min: usize, max: usize, actual: usize },
    #[error("event timestamp must be >= 0, got {0}")]
    NegativeTimestamp(i64),
}

/// The type of an event: a named category such as `login`.
///
/// Invariant: 1 to 100 characters, never empty. No trimming or
/// normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventType(String);

impl EventType {
    pub const MIN_LENGTH: usize = 1;
    pub const MAX_LENGTH: usize = 100;

    /// Create an `EventType`, rejecting empty or over-long strings.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let len = s.chars().count();
        if len < Self::MIN_LENGTH || len > Self::MAX_LENGTH {
            return Err(ValidationError::TypeLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
                actual: len,
            });
        }
        Ok(Self(s))
    }

    /// Create an `EventType` from `s` repeated `n` times.
    pub fn repeated(s: &str, n: usize) -> Result<Self, ValidationError> {
        Self::new(s.repeat(n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EventType {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        t.0
    }
}

/// The value of an event, e.g. the user name attached to a `login`.
///
/// Invariant: 1 to 255 characters, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventValue(String);

impl EventValue {
    pub const MIN_LENGTH: usize = 1;
    pub const MAX_LENGTH: usize = 255;

    /// Create an `EventValue`, rejecting empty or over-long strings.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let len = s.chars().count();
        if len < Self::MIN_LENGTH || len > Self::MAX_LENGTH {
            return Err(ValidationError::ValueLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
                actual: len,
            });
        }
        Ok(Self(s))
    }

    /// Create an `EventValue` from `s` repeated `n` times.
    pub fn repeated(s: &str, n: usize) -> Result<Self, ValidationError> {
        Self::new(s.repeat(n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EventValue {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EventValue> for String {
    fn from(v: EventValue) -> Self {
        v.0
    }
}

/// An event in time. Each event has a type, a value, a unique id, and a
/// timestamp in milliseconds since the epoch.
///
/// Events are immutable once constructed and are never updated in place;
/// the log is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    /// Unique identifier, assigned at creation.
    pub uuid: Uuid,
    /// Category of the event.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Payload of the event.
    pub value: EventValue,
    /// Event time, milliseconds since the Unix epoch. Always >= 0.
    #[serde(rename = "epochMillis")]
    pub epoch_millis: i64,
}

/// Wire mirror of [`Event`]. Deserialization routes through
/// [`Event::new`] so the timestamp invariant holds on every
/// construction path, not just the HTTP boundary.
#[derive(Deserialize)]
struct RawEvent {
    uuid: Uuid,
    #[serde(rename = "type")]
    event_type: EventType,
    value: EventValue,
    #[serde(rename = "epochMillis")]
    epoch_millis: i64,
}

impl TryFrom<RawEvent> for Event {
    type Error = ValidationError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        Event::new(raw.uuid, raw.event_type, raw.value, raw.epoch_millis)
    }
}

impl Event {
    /// Create an event with an explicit id, type, value, and time.
    pub fn new(
        uuid: Uuid,
        event_type: EventType,
        value: EventValue,
        epoch_millis: i64,
    ) -> Result<Self, ValidationError> {
        if epoch_millis < 0 {
            return Err(ValidationError::NegativeTimestamp(epoch_millis));
        }
        Ok(Self {
            uuid,
            event_type,
            value,
            epoch_millis,
        })
    }

    /// Create a placeholder event with the sentinel invalid type and value,
    /// a fresh random id, and the current time.
    ///
    /// Used only to stand in for malformed boundary input; such events must
    /// be rejected via [`Event::is_invalid`] before reaching storage.
    pub fn invalid() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            event_type: EventType(INVALID_TYPE.to_string()),
            value: EventValue(INVALID_VALUE.to_string()),
            epoch_millis: crate::utils::now_millis(),
        }
    }

    /// Whether this is a sentinel placeholder event. True only when both the
    /// type and the value equal their invalid sentinels.
    pub fn is_invalid(&self) -> bool {
        self.event_type.as_str() == INVALID_TYPE && self.value.as_str() == INVALID_VALUE
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = Utc
            .timestamp_millis_opt(self.epoch_millis)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| self.epoch_millis.to_string());
        write!(
            f,
            "uuid '{}', type '{}', value '{}', time '{}'",
            self.uuid, self.event_type, self.value, time
        )
    }
}

/// The count of events for a type. Constructed fresh per query, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    #[serde(rename = "type")]
    pub event_type: String,
    pub count: i64,
}

impl EventCount {
    pub fn new(event_type: impl Into<String>, count: i64) -> Self {
        Self {
            event_type: event_type.into(),
            count,
        }
    }
}
