//! Chat message entity and categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Classification tag on a chat message.
///
/// Categories drive rate-limit admission (each category has its own
/// window) and client-side rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// Ordinary chat traffic.
    RealTimeChat,
    /// Task reminder pings.
    Reminder,
    /// Task lifecycle updates.
    TaskUpdate,
    /// Savings goal updates.
    GoalUpdate,
    /// System-generated notices.
    System,
}

impl MessageCategory {
    /// Return the category as its snake_case wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RealTimeChat => "real_time_chat",
            Self::Reminder => "reminder",
            Self::TaskUpdate => "task_update",
            Self::GoalUpdate => "goal_update",
            Self::System => "system",
        }
    }
}

impl Default for MessageCategory {
    fn default() -> Self {
        Self::RealTimeChat
    }
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: Uuid,
    /// Room the message was sent to.
    pub room_id: Uuid,
    /// Sender.
    pub sender_id: Uuid,
    /// Optional direct target within the room.
    pub target_user_id: Option<Uuid>,
    /// Message category.
    pub category: MessageCategory,
    /// Message body.
    pub content: String,
    /// Optional attachment reference (object-storage URL).
    pub file_url: Option<String>,
    /// Optional structured metadata.
    pub metadata: Option<serde_json::Value>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to persist a new chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
    /// Room the message is sent to.
    pub room_id: Uuid,
    /// Sender.
    pub sender_id: Uuid,
    /// Optional direct target.
    pub target_user_id: Option<Uuid>,
    /// Message category.
    pub category: MessageCategory,
    /// Message body.
    pub content: String,
    /// Optional attachment reference.
    pub file_url: Option<String>,
    /// Optional structured metadata.
    pub metadata: Option<serde_json::Value>,
}
