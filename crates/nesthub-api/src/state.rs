//! Application state shared across all handlers.

use std::sync::Arc;

use nesthub_core::config::AppConfig;
use nesthub_database::MarketStore;
use nesthub_realtime::RealtimeEngine;

/// Shared dependencies, passed to every Axum handler via `State`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Relational store, used by the health check.
    pub store: Arc<dyn MarketStore>,
    /// Realtime gateway engine.
    pub engine: Arc<RealtimeEngine>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn MarketStore>,
        engine: Arc<RealtimeEngine>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
        }
    }
}
