//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::FamilyRole;

/// A NestHub user account, as stored in the relational store.
///
/// Only the fields the gateway needs are mapped here; profile details
/// (avatar, bio, settings) belong to the main API service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Family role (parent or child).
    pub role: FamilyRole,
    /// The family this account belongs to.
    pub family_id: Uuid,
    /// Whether the account is active (deactivated users cannot connect).
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
