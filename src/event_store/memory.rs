//! In-memory [`EventStore`] for tests and ephemeral deployments.
//!
//! Applies exactly the same ordering and tie-break semantics as the SQLite
//! backend so the two are interchangeable behind the trait. A fault toggle
//! lets tests exercise the service layer's degradation policy.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::{descending_order, EventStore, StoreError, StoreResult};
use crate::types::Event;

/// Event store holding everything in process memory.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
    failing: AtomicBool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("fault injection enabled".into()))
        } else {
            Ok(())
        }
    }
}

impl EventStore for MemoryEventStore {
    fn add_event(&self, event: &Event) -> StoreResult<bool> {
        self.check_available()?;
        let mut events = self.events.write();
        // uuid is the primary key; a duplicate affects zero rows.
        if events.iter().any(|e| e.uuid == event.uuid) {
            return Ok(false);
        }
        events.push(event.clone());
        Ok(true)
    }

    fn find_events(&self, event_type: &str) -> StoreResult<Vec<Event>> {
        self.check_available()?;
        let mut matching: Vec<Event> = self
            .events
            .read()
            .iter()
            .filter(|e| e.event_type.as_str() == event_type)
            .cloned()
            .collect();
        matching.sort_by(descending_order);
        Ok(matching)
    }

    fn find_events_in_range(
        &self,
        event_type: &str,
        earliest_millis: i64,
        latest_millis: i64,
    ) -> StoreResult<Vec<Event>> {
        self.check_available()?;
        let mut matching: Vec<Event> = self
            .events
            .read()
            .iter()
            .filter(|e| {
                e.event_type.as_str() == event_type
                    && e.epoch_millis >= earliest_millis
                    && e.epoch_millis <= latest_millis
            })
            .cloned()
            .collect();
        matching.sort_by(descending_order);
        Ok(matching)
    }

    fn find_latest_event(&self, event_type: &str) -> StoreResult<Option<Event>> {
        self.check_available()?;
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| e.event_type.as_str() == event_type)
            .cloned()
            .min_by(descending_order))
    }

    fn find_latest_events(&self) -> StoreResult<Vec<Event>> {
        self.check_available()?;
        let events = self.events.read();
        let mut latest_per_type: BTreeMap<String, Event> = BTreeMap::new();
        for event in events.iter() {
            latest_per_type
                .entry(event.event_type.as_str().to_string())
                .and_modify(|current| {
                    if descending_order(event, current).is_lt() {
                        *current = event.clone();
                    }
                })
                .or_insert_with(|| event.clone());
        }
        // BTreeMap iteration gives type name ascending.
        Ok(latest_per_type.into_values().collect())
    }

    fn count_events(&self, event_type: &str) -> StoreResult<i64> {
        self.check_available()?;
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| e.event_type.as_str() == event_type)
            .count() as i64)
    }

    fn find_all_types(&self) -> StoreResult<Vec<String>> {
        self.check_available()?;
        let events = self.events.read();
        let mut types: Vec<String> = events
            .iter()
            .map(|e| e.event_type.as_str().to_string())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}
