//! Handshake authentication for incoming connections.

use std::sync::Arc;

use tracing::debug;

use nesthub_auth::jwt::JwtDecoder;
use nesthub_core::{AppError, AppResult};
use nesthub_database::MarketStore;
use nesthub_entity::user::User;

/// Verifies a handshake token and resolves the connecting user.
///
/// Token claims establish identity only; role and active status come from
/// the current user row so that a deactivated account or a role change is
/// picked up immediately rather than at token expiry.
pub struct WsAuthenticator {
    decoder: Arc<JwtDecoder>,
    store: Arc<dyn MarketStore>,
}

impl WsAuthenticator {
    pub fn new(decoder: Arc<JwtDecoder>, store: Arc<dyn MarketStore>) -> Self {
        Self { decoder, store }
    }

    /// Validate the token and load the active user it names.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let claims = self.decoder.decode(token)?;
        let user_id = claims.user_id();

        let user = self
            .store
            .find_active_user(user_id)
            .await?
            .ok_or_else(|| AppError::authentication("User not found or inactive"))?;

        if user.role != claims.role {
            debug!(user_id = %user.id, "handshake role claim is stale, using stored role");
        }

        Ok(user)
    }
}
