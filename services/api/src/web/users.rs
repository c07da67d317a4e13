//! services/api/src/web/users.rs
//!
//! User profile and digest unsubscribe endpoints.

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use notebase_core::domain::User;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    ensure_owner,
    middleware::{token_from_headers, token_from_query, AuthUser},
    port_error,
    state::AppState,
};

/// Public view of a user. The password hash never appears here.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "The user to fetch")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 403, description = "Token belongs to another user")
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ensure_owner(caller, user_id)?;
    let user = state
        .users
        .get_user_by_id(user_id)
        .await
        .map_err(port_error)?;
    Ok(Json(UserResponse::from(user)))
}

const UNSUBSCRIBED_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head><meta charset="utf-8" /><title>Unsubscribed</title></head>
  <body style="font-family: Georgia, serif; max-width: 640px; margin: 40px auto; color: #222;">
    <h1 style="font-size: 20px;">You have been unsubscribed.</h1>
    <p>You will no longer receive daily insight emails.</p>
  </body>
</html>
"#;

/// Stop sending digests to the token's user.
///
/// This is the target of the link in every digest email, so it answers with a
/// small HTML page. Accepts the token from the link (`?token=`) or a session token.
#[utoipa::path(
    get,
    path = "/unsubscribe",
    params(("token" = String, Query, description = "Token from the digest email")),
    responses(
        (status = 200, description = "Unsubscribed; confirmation page", content_type = "text/html", body = String),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn unsubscribe_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token = token_from_query(query.as_deref())
        .or_else(|| token_from_headers(&headers))
        .ok_or((StatusCode::UNAUTHORIZED, "A token is required".to_string()))?;

    let claims = state.tokens.verify_token(&token).map_err(|e| {
        warn!("Rejected unsubscribe token: {}", e);
        port_error(e)
    })?;

    notebase_core::unsubscribe(state.users.as_ref(), claims.user_id)
        .await
        .map_err(port_error)?;
    Ok(Html(UNSUBSCRIBED_PAGE))
}
