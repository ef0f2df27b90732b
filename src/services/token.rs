//! Signed session tokens
//!
//! Both the web UI (in the `token` cookie) and the JSON API (as a bearer
//! header) carry the same HS256 JWT. The claims hold only the user id and
//! role label; everything else is looked up per request.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{Role, User};
use crate::services::policy::Requester;

/// Default token lifetime: 24 hours
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: i64,
    /// Role label (`reader`, `teacher`, `admin`)
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    /// The requester these claims identify. Fails on an unknown role label.
    pub fn requester(&self) -> Result<Requester, TokenError> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| TokenError::UnknownRole(self.role.clone()))?;
        Ok(Requester::new(self.id, role))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Decoding(jsonwebtoken::errors::Error),

    #[error("System clock is before the Unix epoch")]
    TimeError,

    #[error("Unknown role in token: {0}")]
    UnknownRole(String),
}

/// Issues and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign a token for `user` valid for the configured lifetime.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TimeError)?
            .as_secs();

        let claims = Claims {
            id: user.id,
            role: user.role.label().to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Check signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Decoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserMeta;
    use chrono::Utc;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            email: "t@example.com".to_string(),
            password_hash: String::new(),
            role,
            meta: UserMeta {
                id,
                firstname: "T".to_string(),
                lastname: "T".to_string(),
                username: "t".to_string(),
                avatar: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new(b"test-secret", DEFAULT_TOKEN_TTL_SECS);
        let token = tokens.issue(&user(42, Role::Teacher)).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.role, "teacher");
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL_SECS);

        let requester = claims.requester().unwrap();
        assert_eq!(requester.id, 42);
        assert_eq!(requester.role, Role::Teacher);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = TokenService::new(b"secret-one", 60);
        let verifier = TokenService::new(b"secret-two", 60);
        let token = issuer.issue(&user(1, Role::Reader)).unwrap();
        assert!(matches!(verifier.verify(&token), Err(TokenError::Decoding(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new(b"secret", 60);
        let claims = Claims {
            id: 1,
            role: "reader".to_string(),
            iat: 1_000,
            exp: 1_060,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let tokens = TokenService::new(b"secret", 60);
        assert!(tokens.verify("not.a.token").is_err());
        assert!(tokens.verify("").is_err());
    }

    #[test]
    fn test_unknown_role_label() {
        let claims = Claims {
            id: 1,
            role: "superuser".to_string(),
            iat: 0,
            exp: 0,
        };
        assert!(matches!(claims.requester(), Err(TokenError::UnknownRole(_))));
    }
}
