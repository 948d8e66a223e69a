//! Task repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use nesthub_core::error::{AppError, ErrorKind};
use nesthub_core::result::AppResult;
use nesthub_entity::task::Task;

/// Repository for chores/tasks.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Create a new task repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a task by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Task>> {
        sqlx::query_as::<_, Task>(
            "SELECT id, family_id, creator_id, assignee_id, title, status, \
                    reward_cents, created_at, completed_at \
             FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find task", e))
    }
}
