//! SQLite-backed [`EventStore`].
//!
//! Ordering, filtering, and the latest-per-type aggregation are pushed into
//! SQL so memory use stays bounded as the log grows. Inserts are single-row
//! and atomic; a uuid conflict affects zero rows and maps to `Ok(false)`.
//!
//! Connections are pooled: each caller checks out its own handle, handles
//! are validated on checkout, and a stale handle is dropped and replaced
//! without the caller noticing.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;
use uuid::Uuid;

use super::{EventStore, StoreError, StoreResult};
use crate::types::{Event, EventType, EventValue};

const UNIQUE_TYPES_SQL: &str = "SELECT DISTINCT type FROM event";

const ALL_EVENTS_SQL: &str =
    "SELECT uuid, type, value, time FROM event WHERE type = ?1 ORDER BY time DESC, uuid DESC";

const LATEST_EVENT_SQL: &str = "SELECT uuid, type, value, time FROM event WHERE type = ?1 \
     ORDER BY time DESC, uuid DESC LIMIT 1";

// Latest per type as one aggregate: group by type for the max time, join
// back to the owning rows, then break timestamp ties on the greatest uuid.
const LATEST_EVENTS_SQL: &str = "SELECT e.uuid, e.type, e.value, e.time FROM event e \
     INNER JOIN (SELECT type, MAX(time) AS time FROM event GROUP BY type) latest \
     ON e.type = latest.type AND e.time = latest.time \
     WHERE e.uuid = (SELECT MAX(u.uuid) FROM event u WHERE u.type = e.type AND u.time = e.time) \
     ORDER BY e.type ASC";

const EVENTS_IN_RANGE_SQL: &str = "SELECT uuid, type, value, time FROM event \
     WHERE type = ?1 AND time >= ?2 AND time <= ?3 ORDER BY time DESC, uuid DESC";

const COUNT_EVENTS_SQL: &str = "SELECT COUNT(*) FROM event WHERE type = ?1";

const INSERT_EVENT_SQL: &str =
    "INSERT OR IGNORE INTO event (uuid, type, value, time) VALUES (?1, ?2, ?3, ?4)";

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS event (
         uuid  TEXT PRIMARY KEY,
         type  TEXT NOT NULL,
         value TEXT NOT NULL,
         time  INTEGER NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_event_type_time ON event (type, time DESC);";

/// Configuration for the SQLite store.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the database file.
    pub db_path: PathBuf,
    /// How long a busy database is retried before an operation fails.
    pub busy_timeout_millis: u64,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/events.db"),
            busy_timeout_millis: 5_000,
        }
    }
}

impl SqliteStoreConfig {
    /// Create config with a custom database path.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Create config with a custom database path (alias for new).
    pub fn with_db_path<P: AsRef<Path>>(db_path: P) -> Self {
        Self::new(db_path)
    }

    /// Get the database file path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

struct PoolInner {
    config: SqliteStoreConfig,
    idle: Mutex<Vec<Connection>>,
}

/// A lazy connection pool over rusqlite.
///
/// Connections are opened on demand, one per concurrent caller, and parked
/// for reuse when a caller finishes. A parked handle that no longer answers
/// a trivial query is discarded and replaced.
#[derive(Clone)]
pub(crate) struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    fn new(config: SqliteStoreConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                idle: Mutex::new(Vec::new()),
            }),
        }
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let config = &self.inner.config;
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.db_path).map_err(StoreError::Connection)?;
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_millis))
            .map_err(StoreError::Connection)?;
        // journal_mode returns the resulting mode as a row.
        conn.query_row("PRAGMA journal_mode=WAL", [], |_row| Ok(()))
            .map_err(StoreError::Connection)?;
        Ok(conn)
    }

    fn checkout(&self) -> StoreResult<PooledConnection> {
        while let Some(conn) = self.inner.idle.lock().pop() {
            let usable = conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok();
            if usable {
                return Ok(PooledConnection {
                    conn: Some(conn),
                    pool: self.clone(),
                });
            }
            // Stale handle; drop it and try the next one.
            warn!("discarding unusable pooled connection");
        }
        let conn = self.open_connection()?;
        Ok(PooledConnection {
            conn: Some(conn),
            pool: self.clone(),
        })
    }
}

/// RAII guard for a checked-out connection; returns it to the pool on drop.
pub(crate) struct PooledConnection {
    conn: Option<Connection>,
    pool: ConnectionPool,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken before drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.inner.idle.lock().push(conn);
        }
    }
}

/// Raw column values for one `event` row, decoded into an [`Event`] in a
/// second step so a bad row can be skipped instead of failing the query.
type RawRow = (String, String, String, i64);

/// Durable event store backed by SQLite.
pub struct SqliteEventStore {
    pool: ConnectionPool,
}

impl SqliteEventStore {
    /// Open (or create) the database at the configured path and ensure the
    /// schema exists.
    pub fn open(config: SqliteStoreConfig) -> StoreResult<Self> {
        let pool = ConnectionPool::new(config);
        let conn = pool.checkout()?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::Query {
                operation: "schema init",
                source: e,
            })?;
        drop(conn);
        Ok(Self { pool })
    }

    fn conn(&self) -> StoreResult<PooledConnection> {
        self.pool.checkout()
    }

    fn decode_row(raw: &RawRow) -> Result<Event, String> {
        let (uuid, event_type, value, time) = raw;
        let uuid = Uuid::parse_str(uuid).map_err(|e| format!("bad uuid '{}': {}", uuid, e))?;
        let event_type =
            EventType::new(event_type.clone()).map_err(|e| format!("bad type: {}", e))?;
        let value = EventValue::new(value.clone()).map_err(|e| format!("bad value: {}", e))?;
        Event::new(uuid, event_type, value, *time).map_err(|e| format!("bad timestamp: {}", e))
    }

    /// Run a multi-row query, skipping rows that fail to decode. The skip is
    /// logged; the caller sees only the remaining valid rows.
    fn query_events(
        &self,
        operation: &'static str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<Event>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(|e| StoreError::Query {
            operation,
            source: e,
        })?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| StoreError::Query {
                operation,
                source: e,
            })?;

        let mut events = Vec::new();
        for raw in rows {
            let raw = raw.map_err(|e| StoreError::Query {
                operation,
                source: e,
            })?;
            match Self::decode_row(&raw) {
                Ok(event) => events.push(event),
                Err(reason) => {
                    warn!(operation, %reason, "skipping undecodable event row");
                }
            }
        }
        Ok(events)
    }
}

impl EventStore for SqliteEventStore {
    fn add_event(&self, event: &Event) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn
            .execute(
                INSERT_EVENT_SQL,
                rusqlite::params![
                    event.uuid.to_string(),
                    event.event_type.as_str(),
                    event.value.as_str(),
                    event.epoch_millis,
                ],
            )
            .map_err(|e| StoreError::Query {
                operation: "add_event",
                source: e,
            })?;
        if rows != 1 {
            warn!(event = %event, "event NOT added to the database");
        }
        Ok(rows == 1)
    }

    fn find_events(&self, event_type: &str) -> StoreResult<Vec<Event>> {
        self.query_events("find_events", ALL_EVENTS_SQL, rusqlite::params![event_type])
    }

    fn find_events_in_range(
        &self,
        event_type: &str,
        earliest_millis: i64,
        latest_millis: i64,
    ) -> StoreResult<Vec<Event>> {
        self.query_events(
            "find_events_in_range",
            EVENTS_IN_RANGE_SQL,
            rusqlite::params![event_type, earliest_millis, latest_millis],
        )
    }

    fn find_latest_event(&self, event_type: &str) -> StoreResult<Option<Event>> {
        let conn = self.conn()?;
        let raw: Option<RawRow> = conn
            .query_row(LATEST_EVENT_SQL, rusqlite::params![event_type], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .optional()
            .map_err(|e| StoreError::Query {
                operation: "find_latest_event",
                source: e,
            })?;
        match raw {
            None => Ok(None),
            Some(raw) => Self::decode_row(&raw)
                .map(Some)
                .map_err(StoreError::RowDecode),
        }
    }

    fn find_latest_events(&self) -> StoreResult<Vec<Event>> {
        self.query_events("find_latest_events", LATEST_EVENTS_SQL, [])
    }

    fn count_events(&self, event_type: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        conn.query_row(COUNT_EVENTS_SQL, rusqlite::params![event_type], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| StoreError::Query {
            operation: "count_events",
            source: e,
        })
    }

    fn find_all_types(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(UNIQUE_TYPES_SQL)
            .map_err(|e| StoreError::Query {
                operation: "find_all_types",
                source: e,
            })?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Query {
                operation: "find_all_types",
                source: e,
            })?;

        let mut types = Vec::new();
        for name in rows {
            match name {
                Ok(name) => types.push(name),
                Err(e) => warn!(error = %e, "skipping unreadable type name"),
            }
        }
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteEventStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = SqliteStoreConfig::with_db_path(temp_dir.path().join("events.db"));
        let store = SqliteEventStore::open(config).unwrap();
        (store, temp_dir)
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

    #[test]
    fn test_add_and_read_back() {
        let (store, _temp_dir) = create_test_store();
        let e = event("login", "user1", 1000);

        assert!(store.add_event(&e).unwrap());
        let found = store.find_latest_event("login").unwrap().unwrap();
        assert_eq!(found, e);
    }

    #[test]
    fn test_duplicate_uuid_is_false_not_error() {
        let (store, _temp_dir) = create_test_store();
        let e = event("login", "user1", 1000);

        assert!(store.add_event(&e).unwrap());
        assert!(!store.add_event(&e).unwrap());
        assert_eq!(store.count_events("login").unwrap(), 1);
    }

    #[test]
    fn test_find_events_descending() {
        let (store, _temp_dir) = create_test_store();
        for millis in [500, 2000, 1000] {
            store.add_event(&event("login", "u", millis)).unwrap();
        }

        let events = store.find_events("login").unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.epoch_millis).collect();
        assert_eq!(times, vec![2000, 1000, 500]);
    }

    #[test]
    fn test_range_is_inclusive_both_ends() {
        let (store, _temp_dir) = create_test_store();
        for millis in [100, 200, 300, 400] {
            store.add_event(&event("login", "u", millis)).unwrap();
        }

        let events = store.find_events_in_range("login", 200, 300).unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.epoch_millis).collect();
        assert_eq!(times, vec![300, 200]);

        // Empty range
        assert!(store.find_events_in_range("login", 300, 200).unwrap().is_empty());
    }

    #[test]
    fn test_latest_events_one_per_type_sorted() {
        let (store, _temp_dir) = create_test_store();
        store.add_event(&event("login", "user1", 1000)).unwrap();
        store.add_event(&event("login", "user2", 2000)).unwrap();
        store.add_event(&event("logout", "user1", 1500)).unwrap();

        let latest = store.find_latest_events().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].event_type.as_str(), "login");
        assert_eq!(latest[0].epoch_millis, 2000);
        assert_eq!(latest[1].event_type.as_str(), "logout");
        assert_eq!(latest[1].epoch_millis, 1500);
    }

    #[test]
    fn test_tie_break_is_greatest_uuid() {
        let (store, _temp_dir) = create_test_store();
        let low = Event::new(
            Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap(),
            EventType::new("tick").unwrap(),
            EventValue::new("low").unwrap(),
            1000,
        )
        .unwrap();
        let high = Event::new(
            Uuid::parse_str("ffffffff-ffff-4fff-bfff-ffffffffffff").unwrap(),
            EventType::new("tick").unwrap(),
            EventValue::new("high").unwrap(),
            1000,
        )
        .unwrap();
        store.add_event(&low).unwrap();
        store.add_event(&high).unwrap();

        let latest = store.find_latest_event("tick").unwrap().unwrap();
        assert_eq!(latest, high);

        let per_type = store.find_latest_events().unwrap();
        assert_eq!(per_type, vec![high.clone()]);

        let all = store.find_events("tick").unwrap();
        assert_eq!(all, vec![high, low]);
    }

    #[test]
    fn test_unknown_type_is_empty_not_error() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.find_events("nope").unwrap().is_empty());
        assert!(store.find_latest_event("nope").unwrap().is_none());
        assert_eq!(store.count_events("nope").unwrap(), 0);
    }

    #[test]
    fn test_find_all_types() {
        let (store, _temp_dir) = create_test_store();
        store.add_event(&event("login", "u", 1)).unwrap();
        store.add_event(&event("login", "u2", 2)).unwrap();
        store.add_event(&event("logout", "u", 3)).unwrap();

        let mut types = store.find_all_types().unwrap();
        types.sort();
        assert_eq!(types, vec!["login".to_string(), "logout".to_string()]);
    }

    #[test]
    fn test_corrupt_row_is_skipped_not_fatal() {
        let (store, temp_dir) = create_test_store();
        store.add_event(&event("login", "good", 1000)).unwrap();

        // Write a row that violates current validation bounds directly.
        let conn =
            Connection::open(temp_dir.path().join("events.db")).unwrap();
        conn.execute(
            "INSERT INTO event (uuid, type, value, time) VALUES (?1, 'login', '', 2000)",
            rusqlite::params![Uuid::new_v4().to_string()],
        )
        .unwrap();

        let events = store.find_events("login").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value.as_str(), "good");
    }

    #[test]
    fn test_pool_reuses_connections_across_operations() {
        let (store, _temp_dir) = create_test_store();
        for i in 0..20 {
            store.add_event(&event("tick", "v", i)).unwrap();
        }
        assert_eq!(store.count_events("tick").unwrap(), 20);
    }

    #[test]
    fn test_concurrent_inserts_are_independently_durable() {
        use std::sync::Arc;
        use std::thread;

        let (store, _temp_dir) = create_test_store();
        let store = Arc::new(store);

        let mut handles = vec![];
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..10 {
                    let e = event("burst", &format!("w{}-{}", i, j), (i * 10 + j) as i64);
                    assert!(store.add_event(&e).unwrap());
                }
            }));
        }
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(store.count_events("burst").unwrap(), 80);
    }
}
