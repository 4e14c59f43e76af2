//! Event Ledger
//!
//! An append-only log of typed, timestamped events with per-type
//! latest-value and time-range queries.
//!
//! # Modules
//!
//! - `types`: Core domain records (Event, EventType, EventValue, EventCount)
//! - `event_store`: The storage contract and its SQLite and in-memory backends
//! - `service`: Query orchestration with the swallow-and-log failure policy
//! - `api`: HTTP surface (axum)
//! - `utils`: Utility functions (timestamps, timing)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use event_ledger::event_store::{SqliteEventStore, SqliteStoreConfig};
//! use event_ledger::service::EventService;
//!
//! let config = SqliteStoreConfig::with_db_path("data/events.db");
//! let store = Arc::new(SqliteEventStore::open(config).unwrap());
//! let service = EventService::new(store);
//! for event in service.latest_events() {
//!     println!("{}", event);
//! }
//! ```

pub mod api;
pub mod event_store;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use event_store::{EventStore, MemoryEventStore, SqliteEventStore, SqliteStoreConfig, StoreError};
pub use service::EventService;
pub use types::{Event, EventCount, EventType, EventValue, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
