//! Bounded in-memory security audit log with live alert rules.
//!
//! The log is a volatile operational cache: a bounded ring buffer that
//! exists for low-latency alerting and live visibility. Restart loses
//! history by design; callers needing a durable trail must tee events to
//! persistent storage through a secondary sink.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use nesthub_core::config::gateway::GatewayConfig;

use super::alerts::{AlertSeverity, AlertSink, SecurityAlert};
use super::event::{AuditCategory, AuditEvent, AuditQuery, AuditRecord};

/// Bounded audit log. Newest events sit at the front of the ring; the
/// oldest entry is evicted once capacity is reached.
pub struct SecurityAuditLog {
    capacity: usize,
    failure_threshold: usize,
    failure_window: Duration,
    events: Mutex<VecDeque<AuditEvent>>,
    sink: Arc<dyn AlertSink>,
}

impl std::fmt::Debug for SecurityAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityAuditLog")
            .field("capacity", &self.capacity)
            .field("failure_threshold", &self.failure_threshold)
            .finish()
    }
}

impl SecurityAuditLog {
    /// Create a log from gateway configuration.
    pub fn new(config: &GatewayConfig, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            capacity: config.audit_capacity,
            failure_threshold: config.alert_failure_threshold,
            failure_window: Duration::seconds(config.alert_failure_window_seconds as i64),
            events: Mutex::new(VecDeque::with_capacity(config.audit_capacity.min(1024))),
            sink,
        }
    }

    /// Take the ring lock, recovering a poisoned guard. The ring is
    /// structurally valid after every push and eviction, so a panic on
    /// another connection's task must not wedge auditing for the rest.
    fn ring(&self) -> MutexGuard<'_, VecDeque<AuditEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one decision: assign id and timestamp, insert at the front
    /// of the ring, evict past capacity, then evaluate alert rules.
    pub fn record(&self, record: AuditRecord) -> AuditEvent {
        self.record_at(record, Utc::now())
    }

    /// Time-parameterized variant of [`Self::record`].
    pub fn record_at(&self, record: AuditRecord, now: DateTime<Utc>) -> AuditEvent {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            timestamp: now,
            category: record.category,
            action: record.action,
            user_id: record.user_id,
            role: record.role,
            target_user_id: record.target_user_id,
            message_category: record.message_category,
            success: record.success,
            error: record.error,
            metadata: record.metadata,
        };

        let failure_count = {
            let mut events = self.ring();
            events.push_front(event.clone());
            while events.len() > self.capacity {
                events.pop_back();
            }

            // Count this user's failures in the trailing window while the
            // lock is held; alert delivery happens after release.
            match (event.success, event.user_id) {
                (false, Some(user_id)) => {
                    let cutoff = now - self.failure_window;
                    events
                        .iter()
                        .filter(|e| {
                            !e.success && e.user_id == Some(user_id) && e.timestamp >= cutoff
                        })
                        .count()
                }
                _ => 0,
            }
        };

        if failure_count >= self.failure_threshold {
            self.emit(SecurityAlert {
                severity: AlertSeverity::High,
                rule: "repeated_failures".to_string(),
                user_id: event.user_id,
                message: format!(
                    "{failure_count} failed actions within {}s",
                    self.failure_window.num_seconds()
                ),
                triggered_at: now,
            });
        }

        if event.category == AuditCategory::RateLimit {
            self.emit(SecurityAlert {
                severity: AlertSeverity::Low,
                rule: "rate_limit_hit".to_string(),
                user_id: event.user_id,
                message: format!("Rate limit hit on '{}'", event.action),
                triggered_at: now,
            });
        }

        event
    }

    /// Deliver an alert, swallowing sink failures.
    fn emit(&self, alert: SecurityAlert) {
        if let Err(e) = self.sink.deliver(&alert) {
            debug!(error = %e, rule = %alert.rule, "Alert delivery failed, dropped");
        }
    }

    /// Filter the retained window, newest first.
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEvent> {
        let events = self.ring();
        let limit = query.limit.unwrap_or(usize::MAX);
        events
            .iter()
            .filter(|e| query.matches(e))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.ring().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
