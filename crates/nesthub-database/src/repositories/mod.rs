//! Per-entity repository implementations.

pub mod chat;
pub mod family;
pub mod goal;
pub mod task;
pub mod user;
