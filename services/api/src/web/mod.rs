pub mod auth;
pub mod cloud;
pub mod highlights;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod users;


use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method, StatusCode,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use notebase_core::{IngestError, PortError};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use self::middleware::{require_api_key, require_auth, AuthUser};
use self::state::AppState;

/// Extracts larger than this are rejected before parsing.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a port failure to the status and message returned to the client.
pub fn port_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Delivery(msg) => {
            error!("Delivery failed: {}", msg);
            (StatusCode::BAD_GATEWAY, "Delivery failed".to_string())
        }
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

pub fn ingest_error(e: IngestError) -> (StatusCode, String) {
    match e {
        IngestError::Malformed(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        IngestError::Port(e) => port_error(e),
    }
}

/// Users may only touch their own resources.
pub fn ensure_owner(caller: AuthUser, user_id: Uuid) -> Result<(), (StatusCode, String)> {
    if caller.0 != user_id {
        return Err((
            StatusCode::FORBIDDEN,
            "Cannot access another user's resources".to_string(),
        ));
    }
    Ok(())
}

//=========================================================================================
// Router
//=========================================================================================

/// Builds the complete application: API routes plus the Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/unsubscribe", get(users::unsubscribe_handler));

    // Protected routes (session token required)
    let protected_routes = Router::new()
        .route("/users/{user_id}", get(users::get_user_handler))
        .route(
            "/users/{user_id}/highlights",
            get(highlights::list_highlights_handler).post(highlights::create_highlight_handler),
        )
        .route(
            "/users/{user_id}/highlights/{id}",
            get(highlights::get_highlight_handler).delete(highlights::delete_highlight_handler),
        )
        .route(
            "/users/{user_id}/kindle-extract",
            post(highlights::upload_extract_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Machine-to-machine routes (X-API-KEY required)
    let cloud_routes = Router::new()
        .route(
            "/cloud/users/{user_id}/kindle-extract/{file_name}",
            post(cloud::cloud_ingest_handler),
        )
        .route("/cloud/daily-insights", post(cloud::daily_insights_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static("x-api-key"),
        ]);

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(cloud_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}
