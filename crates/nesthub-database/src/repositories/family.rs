//! Family linkage repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use nesthub_core::error::{AppError, ErrorKind};
use nesthub_core::result::AppResult;
use nesthub_entity::family::FamilyLink;

/// Repository for parent/child family links.
#[derive(Debug, Clone)]
pub struct FamilyRepository {
    pool: PgPool,
}

impl FamilyRepository {
    /// Create a new family repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an active link between two users, in either direction.
    pub async fn find_active_link_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<Option<FamilyLink>> {
        sqlx::query_as::<_, FamilyLink>(
            "SELECT id, parent_id, child_id, family_id, is_active, created_at \
             FROM family_links \
             WHERE is_active = TRUE \
               AND ((parent_id = $1 AND child_id = $2) OR (parent_id = $2 AND child_id = $1))",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find family link", e))
    }
}
