//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

use crate::adapters::TokenPurpose;
use crate::web::state::AppState;

/// The authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// Finds a token in the `Authorization` header, then the `Authorization` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|c| c.trim().strip_prefix("Authorization="))
        })
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Reads `token=` from a raw query string. Only the unsubscribe link carries
/// its token this way; session tokens never travel in URLs.
pub fn token_from_query(query: Option<&str>) -> Option<String> {
    query.and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}

/// Middleware that validates a session JWT and checks the user still exists.
///
/// If valid, inserts [`AuthUser`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = token_from_headers(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state.tokens.verify_token(&token).map_err(|_| {
        warn!("Rejected an invalid token");
        StatusCode::UNAUTHORIZED
    })?;
    if claims.purpose != TokenPurpose::Session {
        return Err(StatusCode::UNAUTHORIZED);
    }

    state.users.get_user_by_id(claims.user_id).await.map_err(|e| {
        warn!(user_id = %claims.user_id, "Token for unknown user: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(AuthUser(claims.user_id));
    Ok(next.run(req).await)
}

/// Middleware for the machine-to-machine `/cloud` routes: requires `X-API-KEY`.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get("x-api-key")
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if !api_key_matches(provided, state.config.api_key.as_bytes()) {
        warn!("Rejected a request with an invalid api key");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

/// Constant-time comparison of the provided key against the configured one.
fn api_key_matches(provided: &[u8], expected: &[u8]) -> bool {
    !expected.is_empty() && bool::from(provided.ct_eq(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; Authorization=c"));
        assert_eq!(token_from_headers(&headers), Some("c".to_string()));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer h"));
        assert_eq!(token_from_headers(&headers), Some("h".to_string()));
    }

    #[test]
    fn query_token_is_read_separately() {
        assert_eq!(token_from_query(Some("a=1&token=q")), Some("q".to_string()));
        assert_eq!(token_from_query(Some("token=")), None);
        assert_eq!(token_from_query(None), None);
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn api_key_comparison() {
        assert!(api_key_matches(b"cloud-key", b"cloud-key"));
        assert!(!api_key_matches(b"cloud-kez", b"cloud-key"));
        assert!(!api_key_matches(b"cloud", b"cloud-key"));
        assert!(!api_key_matches(b"", b""));
    }
}
