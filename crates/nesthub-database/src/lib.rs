//! # nesthub-database
//!
//! PostgreSQL access layer for the NestHub gateway: per-entity
//! repositories and the [`store::MarketStore`] trait through which the
//! realtime subsystem reads relationships and persists messages. The
//! pool itself lives inside [`store::PgMarketStore`]; nothing outside
//! this crate touches sqlx directly.

pub mod repositories;
pub mod store;

pub use store::{MarketStore, PgMarketStore};
