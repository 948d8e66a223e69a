//! NestHub gateway server.
//!
//! Entry point that wires configuration, the database, authentication,
//! and the realtime engine together and serves the WebSocket gateway.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use nesthub_api::{build_router, AppState};
use nesthub_auth::jwt::JwtDecoder;
use nesthub_core::config::AppConfig;
use nesthub_core::error::AppError;
use nesthub_database::{MarketStore, PgMarketStore};
use nesthub_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Load configuration from TOML files and `NESTHUB__*` variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("NESTHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize the tracing subscriber per logging configuration.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting NestHub gateway v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to database...");
    let store = Arc::new(PgMarketStore::connect(&config.database).await?);
    store.ping().await?;
    tracing::info!("Database connection established");

    let decoder = Arc::new(JwtDecoder::new(&config.auth));

    let engine = Arc::new(RealtimeEngine::new(&config, store.clone(), decoder));
    let sweeper = engine.spawn_sweeper();

    let config = Arc::new(config);
    let state = AppState::new(config.clone(), store.clone(), engine.clone());
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server failed: {e}")))?;

    tracing::info!("Server stopped, draining");
    engine.shutdown();
    sweeper.abort();

    let grace = std::time::Duration::from_secs(config.server.shutdown_grace_seconds);
    if tokio::time::timeout(grace, store.drain()).await.is_err() {
        tracing::warn!("Database pool did not drain within the grace period");
    }
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
