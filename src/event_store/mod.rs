//! Event storage engine.
//!
//! [`EventStore`] is the capability contract any backend must satisfy; the
//! ordering and range semantics of the ledger are defined here, not in the
//! backends. Two backends are provided: [`SqliteEventStore`] for durable
//! storage and [`MemoryEventStore`] for tests and ephemeral use.
//!
//! Ties between events of one type with equal timestamps are broken by uuid,
//! greatest first (lexicographic on the hyphenated form). Every backend
//! applies the same rule so identical stored data always yields identical
//! query results.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryEventStore;
pub use sqlite::{SqliteEventStore, SqliteStoreConfig};

use crate::types::Event;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the storage layer.
///
/// This is the only layer permitted to raise these; the service layer above
/// converts every one of them into an empty/absent result plus a logged
/// diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The persistence medium could not be reached or opened.
    #[error("storage connection failed: {0}")]
    Connection(#[source] rusqlite::Error),
    /// The storage location could not be prepared.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A query failed against a reachable backend.
    #[error("{operation} query failed: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// The backend refused service (used by fault injection in tests and
    /// by backends with no richer error to report).
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    /// A stored row could not be reconstructed into an [`Event`].
    ///
    /// Multi-row queries never surface this: the offending row is skipped
    /// and logged. It is only returned when a single-row lookup decodes to
    /// garbage.
    #[error("stored row could not be decoded: {0}")]
    RowDecode(String),
}

/// The storage abstraction for the append-only event ledger.
///
/// All ordered results are in reverse chronological order (most recent
/// first) unless documented otherwise. Operations fail with [`StoreError`]
/// when the medium is unreachable or the query cannot complete; they never
/// silently return partial results.
pub trait EventStore: Send + Sync {
    /// Persist the event. Returns whether exactly one new record was stored;
    /// `Ok(false)` means the write affected zero rows (e.g. an id conflict),
    /// which is not an error.
    fn add_event(&self, event: &Event) -> StoreResult<bool>;

    /// All events of `event_type`, timestamp descending.
    fn find_events(&self, event_type: &str) -> StoreResult<Vec<Event>>;

    /// Events of `event_type` with `earliest <= timestamp <= latest`,
    /// timestamp descending. Both bounds are inclusive by design.
    fn find_events_in_range(
        &self,
        event_type: &str,
        earliest_millis: i64,
        latest_millis: i64,
    ) -> StoreResult<Vec<Event>>;

    /// The single event of `event_type` with the maximum timestamp, if any.
    /// Among equal timestamps the greatest uuid wins.
    fn find_latest_event(&self, event_type: &str) -> StoreResult<Option<Event>>;

    /// Exactly one latest event for every distinct type present, ordered by
    /// type name ascending. Types with no events simply do not appear.
    fn find_latest_events(&self) -> StoreResult<Vec<Event>>;

    /// Number of stored events of `event_type`; 0 for an unknown type.
    fn count_events(&self, event_type: &str) -> StoreResult<i64>;

    /// Distinct type names across all stored events. Order unspecified;
    /// presentation ordering is the caller's concern.
    fn find_all_types(&self) -> StoreResult<Vec<String>>;
}

/// Comparison key for the uniform tie-break: timestamp descending, then
/// uuid descending. Shared by the in-memory backend and tests.
pub(crate) fn descending_order(a: &Event, b: &Event) -> std::cmp::Ordering {
    b.epoch_millis
        .cmp(&a.epoch_millis)
        .then_with(|| b.uuid.to_string().cmp(&a.uuid.to_string()))
}
