//! HTTP and WebSocket request handlers.

pub mod admin;
pub mod health;
pub mod ws;
