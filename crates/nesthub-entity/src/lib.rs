//! # nesthub-entity
//!
//! Domain entity models for the NestHub marketplace, shared between the
//! gateway and its database layer. Plain data types only; behavior lives
//! in the service crates.

pub mod chat;
pub mod family;
pub mod goal;
pub mod task;
pub mod user;
