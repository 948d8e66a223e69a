//! Savings goal repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use nesthub_core::error::{AppError, ErrorKind};
use nesthub_core::result::AppResult;
use nesthub_entity::goal::SavingsGoal;

/// Repository for savings goals (piggybanks).
#[derive(Debug, Clone)]
pub struct GoalRepository {
    pool: PgPool,
}

impl GoalRepository {
    /// Create a new goal repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a goal by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SavingsGoal>> {
        sqlx::query_as::<_, SavingsGoal>(
            "SELECT id, family_id, owner_id, supervisor_id, title, target_cents, \
                    saved_cents, created_at, updated_at \
             FROM savings_goals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find savings goal", e))
    }
}
