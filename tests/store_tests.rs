//! Store contract tests, run against both backends.
//!
//! Every backend must answer the same queries identically for identical
//! stored data, so the assertions live in shared helpers that take the
//! trait object.

use std::sync::Arc;

use tempfile::TempDir;
use uuid::Uuid;

use event_ledger::event_store::{EventStore, MemoryEventStore, SqliteEventStore, SqliteStoreConfig};
use event_ledger::types::{Event, EventType, EventValue};

fn sqlite_store() -> (Arc<dyn EventStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::with_db_path(temp_dir.path().join("events.db"));
    (Arc::new(SqliteEventStore::open(config).unwrap()), temp_dir)
}

fn memory_store() -> Arc<dyn EventStore> {
    Arc::new(MemoryEventStore::new())
}

fn event(event_type: &str, value: &str, millis: i64) -> Event {
    Event::new(
        Uuid::new_v4(),
        EventType::new(event_type).unwrap(),
        EventValue::new(value).unwrap(),
        millis,
    )
    .unwrap()
}

/// The login/logout scenario: two types, interleaved times.
fn seed_scenario(store: &dyn EventStore) -> (Event, Event, Event) {
    let login1 = event("login", "user1", 1000);
    let login2 = event("login", "user2", 2000);
    let logout = event("logout", "user1", 1500);
    assert!(store.add_event(&login1).unwrap());
    assert!(store.add_event(&login2).unwrap());
    assert!(store.add_event(&logout).unwrap());
    (login1, login2, logout)
}

fn assert_scenario(store: &dyn EventStore) {
    let (login1, login2, logout) = seed_scenario(store);

    // Latest for a type is the t=2000 record.
    assert_eq!(store.find_latest_event("login").unwrap().unwrap(), login2);

    // Latest per type: one per type, ordered by type name.
    let latest = store.find_latest_events().unwrap();
    assert_eq!(latest, vec![login2.clone(), logout.clone()]);

    // Inclusive range catches only the t=1000 record.
    let early = store.find_events_in_range("login", 0, 1200).unwrap();
    assert_eq!(early, vec![login1.clone()]);

    // Boundary timestamps are included at both ends.
    let exact = store.find_events_in_range("login", 1000, 2000).unwrap();
    assert_eq!(exact, vec![login2.clone(), login1.clone()]);

    // Counts and types.
    assert_eq!(store.count_events("login").unwrap(), 2);
    assert_eq!(store.count_events("logout").unwrap(), 1);
    let mut types = store.find_all_types().unwrap();
    types.sort();
    assert_eq!(types, vec!["login".to_string(), "logout".to_string()]);

    // Round trip: what went in comes back equal.
    let found = store
        .find_events_in_range("logout", 1500, 1500)
        .unwrap();
    assert_eq!(found, vec![logout]);
}

fn assert_count_matches_find_all(store: &dyn EventStore) {
    for i in 0..7 {
        store.add_event(&event("tick", "v", i * 100)).unwrap();
    }
    let count = store.count_events("tick").unwrap();
    assert_eq!(count as usize, store.find_events("tick").unwrap().len());
}

fn assert_empty_range(store: &dyn EventStore) {
    store.add_event(&event("tick", "v", 500)).unwrap();
    // earliest > latest selects nothing.
    assert!(store.find_events_in_range("tick", 600, 400).unwrap().is_empty());
}

#[test]
fn test_scenario_sqlite() {
    let (store, _temp_dir) = sqlite_store();
    assert_scenario(store.as_ref());
}

#[test]
fn test_scenario_memory() {
    let store = memory_store();
    assert_scenario(store.as_ref());
}

#[test]
fn test_count_matches_find_all_sqlite() {
    let (store, _temp_dir) = sqlite_store();
    assert_count_matches_find_all(store.as_ref());
}

#[test]
fn test_count_matches_find_all_memory() {
    let store = memory_store();
    assert_count_matches_find_all(store.as_ref());
}

#[test]
fn test_empty_range_sqlite() {
    let (store, _temp_dir) = sqlite_store();
    assert_empty_range(store.as_ref());
}

#[test]
fn test_empty_range_memory() {
    let store = memory_store();
    assert_empty_range(store.as_ref());
}

#[test]
fn test_latest_per_type_dominates_all_others() {
    let (store, _temp_dir) = sqlite_store();
    for t in ["alpha", "beta", "gamma"] {
        for millis in [10, 30, 20] {
            store.add_event(&event(t, "v", millis)).unwrap();
        }
    }

    let latest = store.find_latest_events().unwrap();
    assert_eq!(latest.len(), 3);
    for chosen in &latest {
        let all = store.find_events(chosen.event_type.as_str()).unwrap();
        assert!(all
            .iter()
            .all(|other| other.epoch_millis <= chosen.epoch_millis));
    }
    // Ordered by type name ascending.
    let names: Vec<&str> = latest.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_backends_agree_on_ties() {
    let (sqlite, _temp_dir) = sqlite_store();
    let memory = memory_store();

    let ids = [
        "11111111-1111-4111-8111-111111111111",
        "99999999-9999-4999-8999-999999999999",
        "55555555-5555-4555-8555-555555555555",
    ];
    for id in ids {
        let e = Event::new(
            Uuid::parse_str(id).unwrap(),
            EventType::new("tie").unwrap(),
            EventValue::new(id).unwrap(),
            1000,
        )
        .unwrap();
        sqlite.add_event(&e).unwrap();
        memory.add_event(&e).unwrap();
    }

    let from_sqlite = sqlite.find_events("tie").unwrap();
    let from_memory = memory.find_events("tie").unwrap();
    assert_eq!(from_sqlite, from_memory);
    assert_eq!(
        sqlite.find_latest_event("tie").unwrap(),
        memory.find_latest_event("tie").unwrap()
    );
    assert_eq!(
        from_sqlite[0].uuid.to_string(),
        "99999999-9999-4999-8999-999999999999"
    );
}

#[test]
fn test_sqlite_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.db");
    let e = event("login", "user1", 1000);

    {
        let store = SqliteEventStore::open(SqliteStoreConfig::with_db_path(&path)).unwrap();
        assert!(store.add_event(&e).unwrap());
    }

    let store = SqliteEventStore::open(SqliteStoreConfig::with_db_path(&path)).unwrap();
    assert_eq!(store.find_latest_event("login").unwrap().unwrap(), e);
}
