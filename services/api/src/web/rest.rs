//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the liveness probe.

use axum::response::{IntoResponse, Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{auth, cloud, highlights, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        users::get_user_handler,
        users::unsubscribe_handler,
        highlights::list_highlights_handler,
        highlights::create_highlight_handler,
        highlights::get_highlight_handler,
        highlights::delete_highlight_handler,
        highlights::upload_extract_handler,
        cloud::cloud_ingest_handler,
        cloud::daily_insights_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            users::UserResponse,
            highlights::HighlightResponse,
            highlights::CreateHighlightRequest,
            highlights::IngestResponse,
            cloud::DigestResponse,
        )
    ),
    tags(
        (name = "Notebase API", description = "Kindle highlight ingestion and daily insight digests.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
