//! services/api/src/web/cloud.rs
//!
//! Machine-to-machine endpoints, guarded by `X-API-KEY`: ingesting extracts
//! that were dropped in the file store, and triggering the daily digest.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use notebase_core::{DigestReport, DAILY_INSIGHT_SAMPLE_SIZE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{highlights::IngestResponse, ingest_error, port_error, state::AppState};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DigestResponse {
    pub users_seen: usize,
    pub skipped_inactive: usize,
    pub skipped_empty: usize,
    pub sent: usize,
    pub failed: usize,
}

impl From<DigestReport> for DigestResponse {
    fn from(r: DigestReport) -> Self {
        Self {
            users_seen: r.users_seen,
            skipped_inactive: r.skipped_inactive,
            skipped_empty: r.skipped_empty,
            sent: r.sent,
            failed: r.failed,
        }
    }
}

/// Ingest an extract stored in the file store for a user.
#[utoipa::path(
    post,
    path = "/cloud/users/{user_id}/kindle-extract/{file_name}",
    params(
        ("user_id" = Uuid, Path, description = "Owner of the ingested highlights"),
        ("file_name" = String, Path, description = "Object name in the file store"),
        ("x-api-key" = String, Header, description = "Shared api key")
    ),
    responses(
        (status = 201, description = "Extract ingested", body = IngestResponse),
        (status = 400, description = "Malformed extract"),
        (status = 404, description = "Unknown user or file")
    )
)]
pub async fn cloud_ingest_handler(
    State(state): State<Arc<AppState>>,
    Path((user_id, file_name)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .users
        .get_user_by_id(user_id)
        .await
        .map_err(port_error)?;

    let data = state.files.read(&file_name).await.map_err(port_error)?;
    let created = state
        .ingestor()
        .ingest_bytes(&data, user_id)
        .await
        .map_err(ingest_error)?;

    info!(%user_id, file_name, created, "Ingested extract from file store");
    Ok((StatusCode::CREATED, Json(IngestResponse { created })))
}

/// Run one daily digest pass over every user.
#[utoipa::path(
    post,
    path = "/cloud/daily-insights",
    params(("x-api-key" = String, Header, description = "Shared api key")),
    responses(
        (status = 200, description = "Digest run finished", body = DigestResponse),
        (status = 500, description = "Run aborted on a data integrity or store error")
    )
)]
pub async fn daily_insights_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let report = state
        .dispatcher()
        .run(DAILY_INSIGHT_SAMPLE_SIZE)
        .await
        .map_err(|e| {
            error!("Digest run aborted: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Digest run aborted: {}", e))
        })?;
    Ok(Json(DigestResponse::from(report)))
}
