//! Security audit trail and alerting.

pub mod alerts;
pub mod event;
pub mod log;

pub use alerts::{AlertSeverity, AlertSink, SecurityAlert, TracingAlertSink};
pub use event::{AuditCategory, AuditEvent, AuditQuery, AuditRecord};
pub use log::SecurityAuditLog;
