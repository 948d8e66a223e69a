//! Rate limiting configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single fixed admission window: at most `max_requests` in any
/// window of `duration_ms` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window length in milliseconds.
    pub duration_ms: u64,
    /// Maximum admitted requests per window.
    pub max_requests: u32,
}

impl WindowConfig {
    /// Shorthand constructor.
    pub fn new(duration_ms: u64, max_requests: u32) -> Self {
        Self {
            duration_ms,
            max_requests,
        }
    }
}

/// Rate limiter configuration.
///
/// Each event category gets its own fixed window; categories not present
/// in `categories` fall back to `default`. The `global` window spans all
/// categories combined and is checked first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Per-user ceiling across all categories combined.
    #[serde(default = "default_global")]
    pub global: WindowConfig,
    /// Fallback window for categories without an explicit entry.
    #[serde(default = "default_category")]
    pub default: WindowConfig,
    /// Per-category window overrides, keyed by category name.
    #[serde(default = "default_categories")]
    pub categories: HashMap<String, WindowConfig>,
    /// Interval between garbage collection sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global: default_global(),
            default: default_category(),
            categories: default_categories(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

// Must stay above every per-category ceiling, heartbeat included, or a
// well-behaved client exhausts its own global window.
fn default_global() -> WindowConfig {
    WindowConfig::new(60_000, 240)
}

fn default_category() -> WindowConfig {
    WindowConfig::new(60_000, 60)
}

fn default_categories() -> HashMap<String, WindowConfig> {
    HashMap::from([
        ("real_time_chat".to_string(), WindowConfig::new(60_000, 30)),
        ("join_room".to_string(), WindowConfig::new(60_000, 10)),
        ("task_event".to_string(), WindowConfig::new(60_000, 20)),
        ("goal_event".to_string(), WindowConfig::new(60_000, 20)),
        // Heartbeats are periodic and expected; keep the ceiling high.
        ("heartbeat".to_string(), WindowConfig::new(60_000, 120)),
    ])
}

fn default_sweep_interval() -> u64 {
    60
}
