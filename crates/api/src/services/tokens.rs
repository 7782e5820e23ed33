//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying `userId`, `email` and `role`. Expiry is
//! enforced on verification; there is no revocation list.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use kranes_core::{Role, UserId, UserRecord};

use super::auth::AuthError;

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service signing with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// Sign a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user: &UserRecord) -> Result<String, AuthError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            user_id: user.id.clone(),
            email: user.email.to_string(),
            role: user.role,
            iat,
            exp: iat.saturating_add(ttl),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, expired
    /// or not signed with this service's secret.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kranes_core::Email;

    use super::*;

    const SECRET: &str = "q8Z!r2Lx@9vT#m4Kp$7wN&e1Yb^c6Hs";

    fn user() -> UserRecord {
        UserRecord {
            id: UserId::from("user-1"),
            email: Email::parse("shopper@example.com").unwrap(),
            name: "Shopper".to_string(),
            role: Role::Admin,
            password_hash: String::new(),
            created_at: Utc::now(),
            addresses: Vec::new(),
            cards: Vec::new(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new(&SecretString::from(SECRET), Duration::from_secs(3600));
        let token = tokens.issue(&user()).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, UserId::from("user-1"));
        assert_eq!(claims.email, "shopper@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = TokenService::new(&SecretString::from(SECRET), Duration::from_secs(3600));
        let other = TokenService::new(
            &SecretString::from("another-signing-key-of-32-chars!!"),
            Duration::from_secs(3600),
        );

        let token = issuer.issue(&user()).unwrap();
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new(&SecretString::from(SECRET), Duration::ZERO);
        let token = tokens.issue(&user()).unwrap();
        std::thread::sleep(Duration::from_millis(1100));

        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = TokenService::new(&SecretString::from(SECRET), Duration::from_secs(60));
        assert!(matches!(tokens.verify("not.a.jwt"), Err(AuthError::InvalidToken)));
    }
}
