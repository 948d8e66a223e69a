//! Chat room and membership entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted chat room (one logical broadcast group, usually a family
/// thread or a marketplace conversation).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatRoom {
    /// Unique room identifier.
    pub id: Uuid,
    /// Room display name.
    pub name: String,
    /// The family this room belongs to.
    pub family_id: Uuid,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
    /// Last message or membership activity.
    pub last_activity_at: DateTime<Utc>,
}

/// A persisted room membership record.
///
/// Room join authorization keys off this record: a user may only enter a
/// room with an active membership row. Membership is re-validated against
/// the store on every join, never cached as a trust decision.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomMember {
    /// The room.
    pub room_id: Uuid,
    /// The member.
    pub user_id: Uuid,
    /// Whether the membership is currently active.
    pub is_active: bool,
    /// When the membership was created.
    pub joined_at: DateTime<Utc>,
}
