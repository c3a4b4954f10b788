//! Wordbank Service - HTTP API for bulk word registration
//!
//! This is the main entry point for the wordbank service.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordbank_service::limiter::JANITOR_INTERVAL;
use wordbank_service::{create_router, AppState, ServiceConfig};
use wordbank_store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wordbank=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wordbank Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        bulk_max_tokens = config.bulk_max_tokens,
        bulk_max_words_per_request = config.bulk_max_words_per_request,
        max_active_words_per_user = config.max_active_words_per_user,
        daily_bulk_cap = config.daily_bulk_cap,
        daily_quiz_cap = config.daily_quiz_cap,
        day_boundary = %config.day_boundary.offset(),
        trust_forwarded_for = config.trust_forwarded_for,
        "Service configuration loaded"
    );

    // Build app state over the configured backend
    let state = if let Some(url) = &config.database_url {
        tracing::info!("Connecting to PostgreSQL");
        let store = PgStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        store.verify_schema().await?;
        AppState::new(Arc::new(store), config.clone())
    } else {
        tracing::warn!("DATABASE_URL not set - using in-memory store, data is lost on restart");
        AppState::new(Arc::new(MemoryStore::new()), config.clone())
    };

    let janitor = state
        .limiter
        .as_ref()
        .map(|limiter| limiter.spawn_janitor(JANITOR_INTERVAL));

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    if let Some(janitor) = janitor {
        janitor.abort();
    }

    Ok(())
}
