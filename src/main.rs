//! Bookdesk Server - library lending desk
//!
//! REST API server for books, members, loans and fines.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookdesk_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::{memory::MemoryStore, postgres::PgStore, Repository},
    services::{fines::LoanPolicy, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    tracing::info!("Starting Bookdesk Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = if config.uses_memory_store() {
        tracing::warn!("Using the in-process store; data is lost on shutdown");
        Repository::memory(MemoryStore::new())
    } else {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await
            .context("Failed to connect to database")?;

        tracing::info!("Connected to database");

        PgStore::new(pool.clone())
            .migrate()
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database migrations completed");

        Repository::postgres(pool)
    };

    let policy = LoanPolicy::from(&config.loans);
    tracing::info!(
        "Lending policy: {} loans per user, {} days, {} per overdue day",
        policy.borrowing_limit,
        policy.lending_period_days,
        policy.fine_per_day
    );

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        services: Arc::new(Services::new(repository, policy)),
        config: Arc::new(config),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bookdesk_server={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
