//! Chore/task entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, waiting to be picked up.
    Open,
    /// Being worked on by the assignee.
    InProgress,
    /// Marked done by the assignee, pending parent approval.
    Completed,
    /// Approved and paid out.
    Approved,
}

impl TaskStatus {
    /// Return the status as its snake_case wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chore/task posted by a parent and assigned to a child.
///
/// The gateway loads tasks only to authorize task-scoped realtime events
/// and to derive the notification counterpart; task CRUD lives in the
/// main API service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique task identifier.
    pub id: Uuid,
    /// The family the task belongs to.
    pub family_id: Uuid,
    /// The parent who created the task.
    pub creator_id: Uuid,
    /// The child the task is assigned to.
    pub assignee_id: Uuid,
    /// Task title.
    pub title: String,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Reward in cents.
    pub reward_cents: i64,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was completed, if it has been.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether the given user participates in this task.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id || self.assignee_id == user_id
    }

    /// The other participant, from `user_id`'s point of view.
    ///
    /// Returns `None` if `user_id` is not a participant.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.creator_id == user_id {
            Some(self.assignee_id)
        } else if self.assignee_id == user_id {
            Some(self.creator_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(creator: Uuid, assignee: Uuid) -> Task {
        Task {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            creator_id: creator,
            assignee_id: assignee,
            title: "Rake the leaves".to_string(),
            status: TaskStatus::Open,
            reward_cents: 500,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_counterpart_of() {
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let task = sample_task(parent, child);

        assert_eq!(task.counterpart_of(parent), Some(child));
        assert_eq!(task.counterpart_of(child), Some(parent));
        assert_eq!(task.counterpart_of(Uuid::new_v4()), None);
    }
}
