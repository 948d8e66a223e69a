//! Fixed-window admission control.

pub mod limiter;

pub use limiter::{LimitScope, RateCategory, RateLimitDecision, RateLimiter};
