//! WebSocket upgrade handler.
//!
//! Authentication happens before the upgrade: a missing or invalid token
//! never gets a socket. Every handshake outcome is audited.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use nesthub_core::error::AppError;
use nesthub_entity::user::User;
use nesthub_realtime::audit::{AuditCategory, AuditRecord};

use crate::error::{ApiError, ApiErrorResponse};
use crate::state::AppState;

/// Query parameters for the WebSocket handshake.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let audit = state.engine.audit();

    let Some(token) = query.token else {
        audit.record(AuditRecord::failure(
            AuditCategory::Authentication,
            "handshake",
            None,
            "no token presented",
        ));
        return Ok(reject_missing_token());
    };

    let timeout = Duration::from_secs(state.config.auth.handshake_timeout_seconds);
    let authenticated =
        tokio::time::timeout(timeout, state.engine.authenticator().authenticate(&token)).await;

    let user = match authenticated {
        Ok(Ok(user)) => user,
        Ok(Err(e)) => {
            audit.record(AuditRecord::failure(
                AuditCategory::Authentication,
                "handshake",
                None,
                e.to_string(),
            ));
            return Err(ApiError(e));
        }
        Err(_) => {
            audit.record(AuditRecord::failure(
                AuditCategory::Authentication,
                "handshake",
                None,
                "handshake timed out",
            ));
            return Err(ApiError(AppError::authentication("Authentication timed out")));
        }
    };

    audit.record(
        AuditRecord::success(AuditCategory::Authentication, "handshake", user.id)
            .with_role(user.role),
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(state, user, socket)))
}

fn reject_missing_token() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiErrorResponse {
            error: "AUTH_REQUIRED".to_string(),
            message: "Authentication token required".to_string(),
        }),
    )
        .into_response()
}

/// Drive an established WebSocket connection until it closes.
async fn handle_socket(state: AppState, user: User, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel(state.engine.channel_buffer_size());

    let gateway = state.engine.gateway().clone();
    let handle = gateway.register(&user, tx);
    let conn_id = handle.id;

    info!(conn_id = %conn_id, user_id = %user.id, "WebSocket connection established");

    // Forward queued server events to the socket.
    let outbound = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!(error = %e, "Failed to serialize outbound event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => gateway.handle_raw(&conn_id, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket read error");
                break;
            }
        }
    }

    outbound.abort();
    gateway.disconnect(&conn_id);

    info!(conn_id = %conn_id, user_id = %user.id, "WebSocket connection closed");
}
