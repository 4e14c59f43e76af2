//! Core data structures for the event ledger.

pub mod event;

pub use event::{
    Event, EventCount, EventType, EventValue, ValidationError, INVALID_TYPE, INVALID_VALUE,
};
