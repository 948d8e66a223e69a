//! Audit event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use nesthub_entity::chat::MessageCategory;
use nesthub_entity::user::FamilyRole;

/// Classification of a security-relevant decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    /// Connection lifecycle (connect, disconnect, takeover).
    Connection,
    /// Credential verification at the handshake.
    Authentication,
    /// Relationship/resource authorization decisions.
    Authorization,
    /// Message routing outcomes.
    Message,
    /// Rate-limit rejections.
    RateLimit,
    /// Unexpected store/internal errors during a check.
    Error,
}

impl AuditCategory {
    /// Return the category as its snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Message => "message",
            Self::RateLimit => "rate_limit",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit event: one security-relevant decision, recorded
/// exactly once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier, assigned at record time.
    pub id: Uuid,
    /// Insertion timestamp, assigned at record time.
    pub timestamp: DateTime<Utc>,
    /// Decision classification.
    pub category: AuditCategory,
    /// Action name (e.g. `"send_message"`, `"join_room"`).
    pub action: String,
    /// Acting user, if known (handshake failures may have none).
    pub user_id: Option<Uuid>,
    /// Acting user's role, if resolved.
    pub role: Option<FamilyRole>,
    /// Target user for directed actions.
    pub target_user_id: Option<Uuid>,
    /// Message category for messaging actions.
    pub message_category: Option<MessageCategory>,
    /// Whether the action was allowed/succeeded.
    pub success: bool,
    /// Failure description, when `success` is false.
    pub error: Option<String>,
    /// Additional structured context.
    pub metadata: Option<serde_json::Value>,
}

/// Data required to record a new audit event. The log assigns the id and
/// timestamp.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Decision classification.
    pub category: AuditCategory,
    /// Action name.
    pub action: String,
    /// Acting user, if known.
    pub user_id: Option<Uuid>,
    /// Acting user's role, if resolved.
    pub role: Option<FamilyRole>,
    /// Target user for directed actions.
    pub target_user_id: Option<Uuid>,
    /// Message category for messaging actions.
    pub message_category: Option<MessageCategory>,
    /// Whether the action was allowed/succeeded.
    pub success: bool,
    /// Failure description.
    pub error: Option<String>,
    /// Additional structured context.
    pub metadata: Option<serde_json::Value>,
}

impl AuditRecord {
    /// A successful decision.
    pub fn success(category: AuditCategory, action: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            category,
            action: action.into(),
            user_id: Some(user_id),
            role: None,
            target_user_id: None,
            message_category: None,
            success: true,
            error: None,
            metadata: None,
        }
    }

    /// A denied or failed decision.
    pub fn failure(
        category: AuditCategory,
        action: impl Into<String>,
        user_id: Option<Uuid>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            category,
            action: action.into(),
            user_id,
            role: None,
            target_user_id: None,
            message_category: None,
            success: false,
            error: Some(error.into()),
            metadata: None,
        }
    }

    /// Attach the acting user's role.
    pub fn with_role(mut self, role: FamilyRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Attach a target user.
    pub fn with_target(mut self, target_user_id: Uuid) -> Self {
        self.target_user_id = Some(target_user_id);
        self
    }

    /// Attach a message category.
    pub fn with_message_category(mut self, category: MessageCategory) -> Self {
        self.message_category = Some(category);
        self
    }

    /// Attach structured metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// In-memory filter over the audit window.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Only events for this acting user.
    pub user_id: Option<Uuid>,
    /// Only events of this category.
    pub category: Option<AuditCategory>,
    /// Only events with this success flag.
    pub success: Option<bool>,
    /// Only events at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Only events at or before this time.
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of events to return (newest first).
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Whether an event passes this filter.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(user_id) = self.user_id {
            if event.user_id != Some(user_id) {
                return false;
            }
        }
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(success) = self.success {
            if event.success != success {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }
}
