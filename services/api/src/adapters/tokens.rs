//! services/api/src/adapters/tokens.rs
//!
//! HS256 JWTs for login sessions and digest unsubscribe links. Implements the
//! `TokenIssuer` port from the `core` crate.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use notebase_core::domain::User;
use notebase_core::ports::{PortError, PortResult, TokenIssuer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "notebase";
const SESSION_TTL_DAYS: i64 = 120;
const UNSUBSCRIBE_TTL_DAYS: i64 = 30;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Full API access for the user.
    Session,
    /// Only valid on the unsubscribe route.
    Unsubscribe,
}

/// JWT Claims - data stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: Uuid,
    pub purpose: TokenPurpose,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// Creates and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn create_token(&self, user_id: Uuid, purpose: TokenPurpose) -> PortResult<String> {
        let now = Utc::now();
        let ttl = match purpose {
            TokenPurpose::Session => Duration::days(SESSION_TTL_DAYS),
            TokenPurpose::Unsubscribe => Duration::days(UNSUBSCRIBE_TTL_DAYS),
        };
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            purpose,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: ISSUER.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| PortError::Unexpected(format!("signing token: {}", e)))
    }

    /// Returns the claims if the token is authentic and unexpired.
    pub fn verify_token(&self, token: &str) -> PortResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| PortError::Unauthorized)
    }
}

impl TokenIssuer for JwtService {
    fn issue_unsubscribe_token(&self, user: &User) -> PortResult<String> {
        self.create_token(user.id, TokenPurpose::Unsubscribe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_verify_token() {
        let service = JwtService::new("test_secret_key");
        let user_id = Uuid::new_v4();

        let token = service.create_token(user_id, TokenPurpose::Session).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.purpose, TokenPurpose::Session);
        assert_eq!(claims.iss, ISSUER);
        let expires_in = claims.exp - Utc::now().timestamp();
        assert!(expires_in > (SESSION_TTL_DAYS - 1) * 86_400);
    }

    #[test]
    fn invalid_and_foreign_tokens_are_unauthorized() {
        let service = JwtService::new("secret1");
        let other = JwtService::new("secret2");
        let token = other.create_token(Uuid::new_v4(), TokenPurpose::Session).unwrap();

        assert!(matches!(service.verify_token("invalid_token"), Err(PortError::Unauthorized)));
        assert!(matches!(service.verify_token(&token), Err(PortError::Unauthorized)));
    }

    #[test]
    fn unsubscribe_tokens_carry_their_purpose() {
        let service = JwtService::new("secret");
        let user = User {
            id: Uuid::new_v4(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "a@b.c".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        let token = service.issue_unsubscribe_token(&user).unwrap();
        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.purpose, TokenPurpose::Unsubscribe);
    }
}
