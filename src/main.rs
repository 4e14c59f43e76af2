//! Event Ledger - Binary Entry Point

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use event_ledger::api::{create_router, AppState};
use event_ledger::event_store::{SqliteEventStore, SqliteStoreConfig};
use event_ledger::service::EventService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_path =
        std::env::var("EVENT_DB_PATH").unwrap_or_else(|_| "data/events.db".to_string());
    let bind_addr =
        std::env::var("EVENT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let store = Arc::new(SqliteEventStore::open(SqliteStoreConfig::with_db_path(&db_path))?);
    let service = EventService::new(store);
    let state = Arc::new(AppState::new(service));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, %db_path, "event ledger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
    info!("shutting down");
}
