//! Parent/child linkage entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted parent-child association within a family.
///
/// This is the relationship record that authorizes a parent and a child
/// to message each other and act on each other's resources. Links can be
/// deactivated (e.g. when a child account leaves a family), so eligibility
/// is re-evaluated from the store on every check.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FamilyLink {
    /// Unique link identifier.
    pub id: Uuid,
    /// The parent account.
    pub parent_id: Uuid,
    /// The child account.
    pub child_id: Uuid,
    /// The family both accounts belong to.
    pub family_id: Uuid,
    /// Whether the link is currently active.
    pub is_active: bool,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
}
