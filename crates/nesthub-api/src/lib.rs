//! # nesthub-api
//!
//! HTTP surface for the NestHub realtime gateway: the WebSocket upgrade
//! endpoint, health checks, and operator endpoints for rate-limit and
//! audit inspection.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
