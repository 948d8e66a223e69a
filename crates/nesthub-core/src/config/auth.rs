//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential verification configuration.
///
/// Token issuance lives in the main NestHub API service; the gateway only
/// verifies bearer tokens presented at the WebSocket handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Clock skew leeway for expiry checks, in seconds.
    #[serde(default = "default_leeway")]
    pub jwt_leeway_seconds: u64,
    /// Handshake must complete within this many seconds or the
    /// connection is dropped.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_leeway_seconds: default_leeway(),
            handshake_timeout_seconds: default_handshake_timeout(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_leeway() -> u64 {
    5
}

fn default_handshake_timeout() -> u64 {
    10
}
