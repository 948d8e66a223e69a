//! JWT token validation.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use nesthub_core::config::auth::AuthConfig;
use nesthub_core::error::AppError;

use super::claims::Claims;

/// Validates bearer tokens presented at the WebSocket handshake.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.jwt_leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a bearer token string.
    ///
    /// Checks signature validity and expiration; returns the claims on
    /// success. The caller resolves the user's current role from the
    /// store, since the role in the token may be stale.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use nesthub_core::error::ErrorKind;
    use nesthub_entity::user::FamilyRole;
    use uuid::Uuid;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_leeway_seconds: 0,
            handshake_timeout_seconds: 10,
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign token")
    }

    fn claims_expiring_in(seconds: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            role: FamilyRole::Parent,
            name: "Alex".to_string(),
            iat: now,
            exp: now + seconds,
        }
    }

    #[test]
    fn test_decode_valid_token() {
        let config = test_config();
        let decoder = JwtDecoder::new(&config);
        let claims = claims_expiring_in(600);
        let token = sign(&claims, &config.jwt_secret);

        let decoded = decoder.decode(&token).expect("valid token");
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.role, FamilyRole::Parent);
    }

    #[test]
    fn test_decode_expired_token() {
        let config = test_config();
        let decoder = JwtDecoder::new(&config);
        let token = sign(&claims_expiring_in(-600), &config.jwt_secret);

        let err = decoder.decode(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn test_decode_wrong_secret() {
        let config = test_config();
        let decoder = JwtDecoder::new(&config);
        let token = sign(&claims_expiring_in(600), "other-secret");

        assert!(decoder.decode(&token).is_err());
    }

    #[test]
    fn test_decode_garbage() {
        let decoder = JwtDecoder::new(&test_config());
        assert!(decoder.decode("not-a-jwt").is_err());
    }
}
