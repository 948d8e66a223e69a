//! Operator endpoints: rate-limit inspection and the audit window.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nesthub_realtime::audit::{AuditCategory, AuditEvent, AuditQuery};

use crate::state::AppState;

/// One rate-limit window as reported to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowStatus {
    /// Window name (`"global"` or a category).
    pub category: String,
    /// Requests consumed in the current window.
    pub count: u32,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// GET /admin/rate-limits/{user_id}
///
/// Read-only snapshot of a user's current windows; consumes nothing.
pub async fn rate_limit_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<Vec<WindowStatus>> {
    let status = state
        .engine
        .limiter()
        .status(user_id)
        .into_iter()
        .map(|(category, count, reset_at)| WindowStatus {
            category,
            count,
            reset_at,
        })
        .collect();
    Json(status)
}

/// DELETE /admin/rate-limits/{user_id}
///
/// Clears the user's counters. Future requests are still limited.
pub async fn rate_limit_reset(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> StatusCode {
    state.engine.limiter().reset(user_id);
    tracing::info!(user_id = %user_id, "Rate limit counters reset by operator");
    StatusCode::NO_CONTENT
}

/// Query parameters for the audit window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQueryParams {
    /// Only events for this acting user.
    pub user_id: Option<Uuid>,
    /// Only events of this category.
    pub category: Option<AuditCategory>,
    /// Only events with this success flag.
    pub success: Option<bool>,
    /// Only events at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Only events at or before this time.
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of events (newest first).
    pub limit: Option<usize>,
}

/// GET /admin/audit
pub async fn audit_query(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Json<Vec<AuditEvent>> {
    let query = AuditQuery {
        user_id: params.user_id,
        category: params.category,
        success: params.success,
        since: params.since,
        until: params.until,
        limit: params.limit,
    };
    Json(state.engine.audit().query(&query))
}
