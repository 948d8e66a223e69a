//! Savings goal (piggybank) entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A child's savings goal, co-managed with a supervising parent.
///
/// Piggybank updates are realtime events: when either side changes the
/// balance, the other side is notified through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavingsGoal {
    /// Unique goal identifier.
    pub id: Uuid,
    /// The family the goal belongs to.
    pub family_id: Uuid,
    /// The child who owns the goal.
    pub owner_id: Uuid,
    /// The parent supervising the goal.
    pub supervisor_id: Uuid,
    /// Goal title.
    pub title: String,
    /// Target amount in cents.
    pub target_cents: i64,
    /// Amount saved so far, in cents.
    pub saved_cents: i64,
    /// When the goal was created.
    pub created_at: DateTime<Utc>,
    /// Last balance change.
    pub updated_at: DateTime<Utc>,
}

impl SavingsGoal {
    /// Whether the given user participates in this goal.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.supervisor_id == user_id
    }

    /// The other participant, from `user_id`'s point of view.
    ///
    /// Returns `None` if `user_id` is not a participant.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.owner_id == user_id {
            Some(self.supervisor_id)
        } else if self.supervisor_id == user_id {
            Some(self.owner_id)
        } else {
            None
        }
    }
}
