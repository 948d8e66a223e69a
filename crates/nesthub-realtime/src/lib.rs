//! # nesthub-realtime
//!
//! Realtime messaging gateway for NestHub. Provides:
//!
//! - WebSocket connection management with JWT authentication
//! - Room-scoped message routing and fan-out
//! - Relationship-based authorization (family links, task/goal access)
//! - Fixed-window rate limiting per user and per message category
//! - In-memory security audit trail with live alert rules

pub mod audit;
pub mod authorize;
pub mod connection;
pub mod event;
pub mod gateway;
pub mod ratelimit;
pub mod server;

pub use audit::log::SecurityAuditLog;
pub use authorize::relationship::RelationshipAuthorizer;
pub use connection::pool::ConnectionPool;
pub use gateway::ChatGateway;
pub use ratelimit::limiter::RateLimiter;
pub use server::RealtimeEngine;
