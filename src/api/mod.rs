mod auth;
mod error;

use axum::{Json, Router, response::IntoResponse, routing::get};
use std::sync::Arc;

use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;
use crate::session::SessionService;

pub use error::ApiError;

/// Create the versioned API router (mounted at `/api/{version}`).
pub fn create_api_router(
    sessions: SessionService,
    jwt: Arc<JwtConfig>,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        sessions,
        jwt,
        rate_limit,
    };

    Router::new().nest("/auth", auth::router(auth_state))
}

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// JSON 404 for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("resource not found")
}

pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}
