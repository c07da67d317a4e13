//! services/api/src/web/highlights.rs
//!
//! Highlight CRUD and Kindle extract upload for the authenticated user.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use notebase_core::domain::{Highlight, NewHighlight};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{ensure_owner, ingest_error, middleware::AuthUser, port_error, state::AppState};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HighlightResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: String,
    pub text: String,
    pub location: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Highlight> for HighlightResponse {
    fn from(h: Highlight) -> Self {
        Self {
            id: h.id,
            user_id: h.user_id,
            book_id: h.book_id,
            text: h.text,
            location: h.location,
            note: h.note,
            created_at: h.created_at,
            updated_at: h.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHighlightRequest {
    pub book_id: String,
    pub text: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct IngestResponse {
    /// Number of highlights created from the extract.
    pub created: usize,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List every highlight of a user.
#[utoipa::path(
    get,
    path = "/users/{user_id}/highlights",
    params(("user_id" = Uuid, Path, description = "Owner of the highlights")),
    responses(
        (status = 200, description = "The user's highlights", body = [HighlightResponse]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token belongs to another user")
    )
)]
pub async fn list_highlights_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ensure_owner(caller, user_id)?;
    let highlights = state
        .highlights
        .list_highlights_by_user(user_id)
        .await
        .map_err(port_error)?;
    let body: Vec<HighlightResponse> = highlights.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Create a highlight by hand. The referenced book must already exist.
#[utoipa::path(
    post,
    path = "/users/{user_id}/highlights",
    params(("user_id" = Uuid, Path, description = "Owner of the new highlight")),
    request_body = CreateHighlightRequest,
    responses(
        (status = 201, description = "Highlight created", body = HighlightResponse),
        (status = 404, description = "Unknown book")
    )
)]
pub async fn create_highlight_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<CreateHighlightRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ensure_owner(caller, user_id)?;
    if req.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "text is required".to_string()));
    }
    state
        .books
        .get_book_by_isbn(&req.book_id)
        .await
        .map_err(port_error)?;

    let highlight = state
        .highlights
        .create_highlight(NewHighlight {
            user_id,
            book_id: req.book_id,
            text: req.text,
            location: req.location,
            note: req.note.unwrap_or_default(),
        })
        .await
        .map_err(port_error)?;

    Ok((StatusCode::CREATED, Json(HighlightResponse::from(highlight))))
}

/// Fetch one highlight of a user.
#[utoipa::path(
    get,
    path = "/users/{user_id}/highlights/{id}",
    params(
        ("user_id" = Uuid, Path, description = "Owner of the highlight"),
        ("id" = Uuid, Path, description = "Highlight id")
    ),
    responses(
        (status = 200, description = "The highlight", body = HighlightResponse),
        (status = 404, description = "No such highlight for this user")
    )
)]
pub async fn get_highlight_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ensure_owner(caller, user_id)?;
    let highlight = state
        .highlights
        .get_highlight_by_id(id, user_id)
        .await
        .map_err(port_error)?;
    Ok(Json(HighlightResponse::from(highlight)))
}

/// Delete one highlight of a user.
#[utoipa::path(
    delete,
    path = "/users/{user_id}/highlights/{id}",
    params(
        ("user_id" = Uuid, Path, description = "Owner of the highlight"),
        ("id" = Uuid, Path, description = "Highlight id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such highlight for this user")
    )
)]
pub async fn delete_highlight_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ensure_owner(caller, user_id)?;
    state
        .highlights
        .delete_highlight(id, user_id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a Kindle extract and ingest it for the user.
///
/// Accepts a multipart/form-data request; the `file` part (or the first part) is read.
#[utoipa::path(
    post,
    path = "/users/{user_id}/kindle-extract",
    params(("user_id" = Uuid, Path, description = "Owner of the ingested highlights")),
    request_body(content_type = "multipart/form-data", description = "The extract JSON file."),
    responses(
        (status = 201, description = "Extract ingested", body = IngestResponse),
        (status = 400, description = "Missing file or malformed extract"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_extract_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ensure_owner(caller, user_id)?;
    let data = read_upload(multipart).await?;

    let created = state
        .ingestor()
        .ingest_bytes(&data, user_id)
        .await
        .map_err(ingest_error)?;

    Ok((StatusCode::CREATED, Json(IngestResponse { created })))
}

async fn read_upload(mut multipart: Multipart) -> Result<Bytes, (StatusCode, String)> {
    let mut first: Option<Bytes> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let is_file = field.name() == Some("file");
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        if is_file {
            return Ok(data);
        }
        first.get_or_insert(data);
    }

    first.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        )
    })
}

