//! Security alert rules and delivery sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use nesthub_core::error::AppError;

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Operational signal, worth watching.
    Low,
    /// Likely abuse or misconfiguration, needs attention.
    High,
}

/// A triggered security alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAlert {
    /// Severity of the alert.
    pub severity: AlertSeverity,
    /// Short rule identifier (e.g. `"repeated_failures"`).
    pub rule: String,
    /// The user the alert concerns, if known.
    pub user_id: Option<Uuid>,
    /// Human-readable description.
    pub message: String,
    /// When the alert fired.
    pub triggered_at: DateTime<Utc>,
}

/// Destination for triggered alerts.
///
/// Delivery is synchronous and side-effect-only: it must not block the
/// recording path, and delivery failures are swallowed by the caller,
/// never re-thrown into the primary operation.
pub trait AlertSink: Send + Sync {
    /// Deliver one alert.
    fn deliver(&self, alert: &SecurityAlert) -> Result<(), AppError>;
}

/// Default sink: emits alerts to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn deliver(&self, alert: &SecurityAlert) -> Result<(), AppError> {
        match alert.severity {
            AlertSeverity::High => error!(
                rule = %alert.rule,
                user_id = ?alert.user_id,
                message = %alert.message,
                "Security alert"
            ),
            AlertSeverity::Low => warn!(
                rule = %alert.rule,
                user_id = ?alert.user_id,
                message = %alert.message,
                "Security alert"
            ),
        }
        Ok(())
    }
}
