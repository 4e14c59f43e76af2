//! Query service: thin orchestration over the storage interface.
//!
//! Deliberate policy, preserved from the system this replaces: read
//! failures at the storage layer degrade to empty/absent results and are
//! reported only through logs, never to the caller. The one exception is
//! [`EventService::count_events`], which returns `None` on failure so a
//! failed count cannot be mistaken for a count of zero. Writes collapse
//! internal faults to `false`.

use std::sync::Arc;

use tracing::{error, warn};

use crate::event_store::EventStore;
use crate::types::{Event, EventCount};
use crate::utils::now_millis;

/// The core business logic of the event ledger.
///
/// Stateless: the only state is the persisted log behind the store.
pub struct EventService {
    store: Arc<dyn EventStore>,
}

impl EventService {
    /// Create an `EventService` with the store to use for persistence.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// All event types known to the store.
    pub fn all_event_types(&self) -> Vec<String> {
        match self.store.find_all_types() {
            Ok(types) => types,
            Err(e) => {
                warn!(error = %e, "couldn't retrieve event types");
                Vec::new()
            }
        }
    }

    /// Add the event; returns whether it was stored.
    pub fn add_event(&self, event: &Event) -> bool {
        match self.store.add_event(event) {
            Ok(was_added) => was_added,
            Err(e) => {
                warn!(error = %e, event = %event, "couldn't add event");
                false
            }
        }
    }

    /// The latest event for the type, or `None` if the type has no events
    /// (or the lookup failed).
    pub fn latest_event(&self, event_type: &str) -> Option<Event> {
        match self.store.find_latest_event(event_type) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, event_type, "couldn't retrieve latest event");
                None
            }
        }
    }

    /// The latest event for every type, ordered by type name.
    pub fn latest_events(&self) -> Vec<Event> {
        match self.store.find_latest_events() {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "couldn't retrieve latest events");
                Vec::new()
            }
        }
    }

    /// All events for a type: the range query from the epoch to now,
    /// with "now" resolved once at the moment of the call.
    pub fn find_events(&self, event_type: &str) -> Vec<Event> {
        self.find_events_in_range(event_type, 0, now_millis())
    }

    /// Events for a type between `earliest_millis` and `latest_millis`,
    /// both inclusive.
    pub fn find_events_in_range(
        &self,
        event_type: &str,
        earliest_millis: i64,
        latest_millis: i64,
    ) -> Vec<Event> {
        match self
            .store
            .find_events_in_range(event_type, earliest_millis, latest_millis)
        {
            Ok(events) => events,
            Err(e) => {
                error!(
                    error = %e,
                    event_type,
                    earliest_millis,
                    latest_millis,
                    "couldn't retrieve events in range"
                );
                Vec::new()
            }
        }
    }

    /// The event count for a type. `None` means the count could not be
    /// determined, which is distinct from a count of zero.
    pub fn count_events(&self, event_type: &str) -> Option<EventCount> {
        match self.store.count_events(event_type) {
            Ok(count) => Some(EventCount::new(event_type, count)),
            Err(e) => {
                error!(error = %e, event_type, "couldn't retrieve event count");
                None
            }
        }
    }
}
