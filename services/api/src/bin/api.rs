//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::DbAdapter,
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use testcase_core::memory::{InMemoryRecordStore, InMemoryTokenStore, InMemoryUserStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose Storage: Postgres when configured, in-memory otherwise ---
    let app_state = match config.database_url.as_deref() {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            AppState::build(
                config.clone(),
                db_adapter.clone(),
                db_adapter.clone(),
                db_adapter,
            )
        }
        None => {
            warn!("DATABASE_URL is not set; accounts and records are kept in memory only");
            AppState::build(
                config.clone(),
                Arc::new(InMemoryUserStore::default()),
                Arc::new(InMemoryTokenStore::default()),
                Arc::new(InMemoryRecordStore::default()),
            )
        }
    };

    // --- 3. Report the Generation Engines ---
    let providers = app_state.orchestrator.providers();
    if config.providers.is_empty() {
        warn!("No AI provider API keys configured; generation runs in demo mode");
    }
    info!(default = %providers.default_id(), "Default AI provider resolved");

    // --- 4. Create the Web Router ---
    let app = build_router(Arc::new(app_state))?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
