//! Inbound and outbound gateway event type definitions.
//!
//! Both directions are closed tagged enums: adding an event is a
//! compile-time-checked change, and dispatch is an exhaustive match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nesthub_entity::chat::MessageCategory;
use nesthub_entity::user::FamilyRole;

/// Events sent by the client to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join a chat room.
    JoinRoom {
        /// Room to join.
        room_id: Uuid,
    },
    /// Leave a chat room.
    LeaveRoom {
        /// Room to leave.
        room_id: Uuid,
    },
    /// Send a message to a room (optionally targeted at one member).
    SendMessage {
        /// Destination room.
        room_id: Uuid,
        /// Message body.
        message: String,
        /// Message category (drives rate limiting).
        #[serde(default)]
        category: MessageCategory,
        /// Optional direct target within the room.
        target_user_id: Option<Uuid>,
        /// Optional attachment reference.
        file_url: Option<String>,
        /// Optional structured metadata.
        metadata: Option<serde_json::Value>,
    },
    /// Typing indicator update.
    Typing {
        /// Room the indicator applies to.
        room_id: Uuid,
        /// Whether the user started or stopped typing.
        is_typing: bool,
    },
    /// A task was created; notify the counterpart.
    TaskCreated {
        /// The task.
        task_id: Uuid,
        /// Room context for the notification.
        room_id: Uuid,
    },
    /// A task was completed; notify the counterpart.
    TaskCompleted {
        /// The task.
        task_id: Uuid,
        /// Room context for the notification.
        room_id: Uuid,
    },
    /// A savings goal balance changed; notify the counterpart.
    PiggybankUpdated {
        /// The goal.
        goal_id: Uuid,
        /// Room context for the notification.
        room_id: Uuid,
    },
    /// Client-initiated liveness ping.
    Ping {
        /// Client timestamp, echoed back in the pong.
        timestamp: i64,
    },
}

/// Events sent by the gateway to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection acknowledged after successful authentication.
    Connected {
        /// Resolved user identity.
        user_id: Uuid,
        /// Resolved family role.
        role: FamilyRole,
    },
    /// A user joined a room.
    UserJoined {
        /// The room.
        room_id: Uuid,
        /// Who joined.
        user_id: Uuid,
        /// Display name.
        name: String,
    },
    /// A user left a room.
    UserLeft {
        /// The room.
        room_id: Uuid,
        /// Who left.
        user_id: Uuid,
        /// Display name.
        name: String,
    },
    /// A new message arrived in a room.
    NewMessage {
        /// Persisted message ID.
        id: Uuid,
        /// The room.
        room_id: Uuid,
        /// Sender.
        sender_id: Uuid,
        /// Sender display name.
        sender_name: String,
        /// Direct target, if any.
        target_user_id: Option<Uuid>,
        /// Message category.
        category: MessageCategory,
        /// Message body.
        message: String,
        /// Attachment reference, if any.
        file_url: Option<String>,
        /// Structured metadata, if any.
        metadata: Option<serde_json::Value>,
        /// Persistence timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Echo to the sender confirming a message was persisted and routed.
    MessageSent {
        /// Persisted message ID.
        id: Uuid,
        /// The room.
        room_id: Uuid,
        /// Persistence timestamp.
        timestamp: DateTime<Utc>,
    },
    /// A user started typing.
    UserTyping {
        /// The room.
        room_id: Uuid,
        /// Who is typing.
        user_id: Uuid,
        /// Display name.
        name: String,
    },
    /// A user stopped typing.
    UserStoppedTyping {
        /// The room.
        room_id: Uuid,
        /// Who stopped.
        user_id: Uuid,
        /// Display name.
        name: String,
    },
    /// Task-created notification for the derived counterpart.
    TaskCreated {
        /// The task.
        task_id: Uuid,
        /// Room context.
        room_id: Uuid,
        /// Who performed the action.
        actor_id: Uuid,
        /// Task title.
        title: String,
    },
    /// Task-completed notification for the derived counterpart.
    TaskCompleted {
        /// The task.
        task_id: Uuid,
        /// Room context.
        room_id: Uuid,
        /// Who performed the action.
        actor_id: Uuid,
        /// Task title.
        title: String,
    },
    /// Piggybank update notification for the derived counterpart.
    PiggybankUpdated {
        /// The goal.
        goal_id: Uuid,
        /// Room context.
        room_id: Uuid,
        /// Who performed the action.
        actor_id: Uuid,
        /// New saved amount in cents.
        saved_cents: i64,
        /// Target amount in cents.
        target_cents: i64,
    },
    /// Liveness pong, echoing the client's ping timestamp.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
    /// Error response for a rejected action.
    Error {
        /// Coded reason.
        code: ErrorCode,
        /// Human-readable description.
        message: String,
        /// For rate-limit errors, when the window resets.
        #[serde(skip_serializing_if = "Option::is_none")]
        reset_at: Option<DateTime<Utc>>,
    },
}

impl ServerEvent {
    /// Shorthand for a plain error event.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
            reset_at: None,
        }
    }

    /// Shorthand for a rate-limit error event carrying the reset time.
    pub fn rate_limited(message: impl Into<String>, reset_at: DateTime<Utc>) -> Self {
        Self::Error {
            code: ErrorCode::RateLimitExceeded,
            message: message.into(),
            reset_at: Some(reset_at),
        }
    }
}

/// Coded error reasons surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No credential was presented at the handshake.
    AuthRequired,
    /// The presented credential failed verification.
    InvalidToken,
    /// This connection was replaced by a newer one for the same user.
    SessionReplaced,
    /// No active membership record for the room.
    RoomAccessDenied,
    /// No qualifying relationship between sender and target.
    InvalidRelationship,
    /// Caller does not participate in the task.
    TaskAccessDenied,
    /// Caller does not participate in the savings goal.
    GoalAccessDenied,
    /// Admission rejected by the rate limiter.
    RateLimitExceeded,
    /// The inbound payload did not parse as a known event.
    InvalidEvent,
    /// Unexpected internal failure while joining a room.
    JoinFailed,
    /// Unexpected internal failure while sending a message.
    MessageFailed,
    /// Unexpected internal failure while processing a resource event.
    EventFailed,
}

impl ErrorCode {
    /// Return the code as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::SessionReplaced => "SESSION_REPLACED",
            Self::RoomAccessDenied => "ROOM_ACCESS_DENIED",
            Self::InvalidRelationship => "INVALID_RELATIONSHIP",
            Self::TaskAccessDenied => "TASK_ACCESS_DENIED",
            Self::GoalAccessDenied => "GOAL_ACCESS_DENIED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InvalidEvent => "INVALID_EVENT",
            Self::JoinFailed => "JOIN_FAILED",
            Self::MessageFailed => "MESSAGE_FAILED",
            Self::EventFailed => "EVENT_FAILED",
        }
    }
}
