//! # nesthub-core
//!
//! Core crate for the NestHub realtime gateway. Contains configuration
//! schemas and the unified error system.
//!
//! This crate has **no** internal dependencies on other NestHub crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
