//! Relationship authorizer: pure query functions over the relational
//! store, one verdict per call.
//!
//! Nothing here is cached. Relationships and memberships can change
//! between messages, so every check re-reads current store state and the
//! verdict is discarded after the decision. A store error propagates as
//! `Err`; the caller treats that as a denial (fail-closed) and records an
//! error-category audit event, distinct from an authorization denial.

use std::sync::Arc;

use uuid::Uuid;

use nesthub_core::result::AppResult;
use nesthub_database::MarketStore;
use nesthub_entity::chat::RoomMember;
use nesthub_entity::family::FamilyLink;
use nesthub_entity::goal::SavingsGoal;
use nesthub_entity::task::Task;
use nesthub_entity::user::FamilyRole;

/// Verdict of an authorization check.
///
/// `Allowed` carries the resolved data the caller needs to act (the
/// relationship record, resource snapshot, or derived counterpart).
#[derive(Debug, Clone)]
pub enum AuthzOutcome<T> {
    /// The action is allowed.
    Allowed(T),
    /// The action is denied, with a reason for the audit trail.
    Denied(&'static str),
}

impl<T> AuthzOutcome<T> {
    /// Whether the outcome is a grant.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Authorization checks backed by the relational store.
#[derive(Clone)]
pub struct RelationshipAuthorizer {
    store: Arc<dyn MarketStore>,
}

impl std::fmt::Debug for RelationshipAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipAuthorizer").finish()
    }
}

impl RelationshipAuthorizer {
    /// Create an authorizer over the given store.
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// May `from` send a direct message to `to`?
    ///
    /// Allowed iff an active parent/child link connects the two users at
    /// query time. The link record itself guarantees opposite roles.
    pub async fn direct_message_eligibility(
        &self,
        from: Uuid,
        to: Uuid,
    ) -> AppResult<AuthzOutcome<FamilyLink>> {
        if from == to {
            return Ok(AuthzOutcome::Denied("cannot target yourself"));
        }

        match self.store.find_active_link_between(from, to).await? {
            Some(link) => Ok(AuthzOutcome::Allowed(link)),
            None => Ok(AuthzOutcome::Denied(
                "no active family link between sender and target",
            )),
        }
    }

    /// Does `user_id` hold an active membership in `room_id`?
    pub async fn room_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<AuthzOutcome<RoomMember>> {
        match self.store.find_active_membership(room_id, user_id).await? {
            Some(member) => Ok(AuthzOutcome::Allowed(member)),
            None => Ok(AuthzOutcome::Denied("no active room membership")),
        }
    }

    /// May `user_id` (with `role`) act on task `task_id`?
    ///
    /// Allowed iff the caller participates in the task and, when the
    /// action demands a specific role, the caller's role matches. Returns
    /// the task snapshot for the caller to act on.
    pub async fn task_access(
        &self,
        user_id: Uuid,
        role: FamilyRole,
        task_id: Uuid,
        required_role: Option<FamilyRole>,
    ) -> AppResult<AuthzOutcome<Task>> {
        let Some(task) = self.store.find_task(task_id).await? else {
            return Ok(AuthzOutcome::Denied("task not found"));
        };

        if !task.involves(user_id) {
            return Ok(AuthzOutcome::Denied("caller does not participate in task"));
        }

        if let Some(required) = required_role {
            if role != required {
                return Ok(AuthzOutcome::Denied("caller role not allowed for action"));
            }
        }

        Ok(AuthzOutcome::Allowed(task))
    }

    /// May `user_id` (with `role`) act on savings goal `goal_id`?
    pub async fn goal_access(
        &self,
        user_id: Uuid,
        role: FamilyRole,
        goal_id: Uuid,
        required_role: Option<FamilyRole>,
    ) -> AppResult<AuthzOutcome<SavingsGoal>> {
        let Some(goal) = self.store.find_goal(goal_id).await? else {
            return Ok(AuthzOutcome::Denied("goal not found"));
        };

        if !goal.involves(user_id) {
            return Ok(AuthzOutcome::Denied("caller does not participate in goal"));
        }

        if let Some(required) = required_role {
            if role != required {
                return Ok(AuthzOutcome::Denied("caller role not allowed for action"));
            }
        }

        Ok(AuthzOutcome::Allowed(goal))
    }

    /// Derive the counterpart to notify for an already-authorized action,
    /// then re-check direct-message eligibility on the derived pair.
    ///
    /// The counterpart comes from the resource snapshot, never from a
    /// client-supplied target.
    pub async fn notification_target(
        &self,
        from: Uuid,
        counterpart: Option<Uuid>,
    ) -> AppResult<AuthzOutcome<Uuid>> {
        let Some(target) = counterpart else {
            return Ok(AuthzOutcome::Denied("no counterpart for resource"));
        };

        match self.direct_message_eligibility(from, target).await? {
            AuthzOutcome::Allowed(_) => Ok(AuthzOutcome::Allowed(target)),
            AuthzOutcome::Denied(reason) => Ok(AuthzOutcome::Denied(reason)),
        }
    }
}
