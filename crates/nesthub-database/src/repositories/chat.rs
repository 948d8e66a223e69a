//! Chat room and message repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use nesthub_core::error::{AppError, ErrorKind};
use nesthub_core::result::AppResult;
use nesthub_entity::chat::{ChatMessage, ChatRoom, NewChatMessage, RoomMember};

/// Repository for chat rooms, memberships, and messages.
#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    /// Create a new chat repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a room by ID.
    pub async fn find_room(&self, room_id: Uuid) -> AppResult<Option<ChatRoom>> {
        sqlx::query_as::<_, ChatRoom>(
            "SELECT id, name, family_id, created_at, last_activity_at \
             FROM chat_rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find chat room", e))
    }

    /// Find an active membership record for a user in a room.
    pub async fn find_active_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<RoomMember>> {
        sqlx::query_as::<_, RoomMember>(
            "SELECT room_id, user_id, is_active, joined_at \
             FROM chat_room_members \
             WHERE room_id = $1 AND user_id = $2 AND is_active = TRUE",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find room membership", e)
        })
    }

    /// Persist a new chat message.
    pub async fn create_message(&self, data: &NewChatMessage) -> AppResult<ChatMessage> {
        sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO chat_messages \
             (room_id, sender_id, target_user_id, category, content, file_url, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.room_id)
        .bind(data.sender_id)
        .bind(data.target_user_id)
        .bind(data.category)
        .bind(&data.content)
        .bind(&data.file_url)
        .bind(&data.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create message", e))
    }

    /// Update a room's last-activity timestamp to now.
    pub async fn touch_room(&self, room_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE chat_rooms SET last_activity_at = NOW() WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch room", e))?;
        Ok(())
    }
}
