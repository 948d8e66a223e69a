//! # nesthub-auth
//!
//! Bearer credential verification for the NestHub gateway. Tokens are
//! issued by the main NestHub API service; this crate only verifies them
//! (signature + expiry) and extracts the caller's identity and role.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder};
