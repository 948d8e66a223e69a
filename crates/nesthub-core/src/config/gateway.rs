//! Realtime gateway configuration.

use serde::{Deserialize, Serialize};

/// Realtime (WebSocket) gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Per-connection outbound channel buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Capacity of the in-memory security audit ring buffer.
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
    /// Number of failures per user that triggers a high-severity alert.
    #[serde(default = "default_failure_threshold")]
    pub alert_failure_threshold: usize,
    /// Trailing window for the failure alert rule, in seconds.
    #[serde(default = "default_failure_window")]
    pub alert_failure_window_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            audit_capacity: default_audit_capacity(),
            alert_failure_threshold: default_failure_threshold(),
            alert_failure_window_seconds: default_failure_window(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_audit_capacity() -> usize {
    10_000
}

fn default_failure_threshold() -> usize {
    5
}

fn default_failure_window() -> u64 {
    300
}
