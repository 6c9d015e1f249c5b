//! Session API endpoints.
//!
//! - POST `/signup` - Create an account
//! - POST `/login` - Exchange credentials for an access + refresh token
//! - POST `/refresh` - Rotate a refresh token into a new token pair
//! - POST `/logout` - Revoke a refresh token
//! - GET `/me` - Current user (bearer token required)

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{CurrentUser, require_auth};
use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimitConfig, rate_limit_auth};
use crate::session::SessionService;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionService,
    pub jwt: Arc<JwtConfig>,
    pub rate_limit: Arc<RateLimitConfig>,
}

pub fn router(state: AuthState) -> Router {
    let credential_routes = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_auth,
        ));

    let protected_routes = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            require_auth,
        ));

    Router::new()
        .merge(credential_routes)
        .merge(protected_routes)
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct SignupRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshTokenRequest {
    refresh_token: String,
}

async fn signup(
    State(state): State<AuthState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let user = state
        .sessions
        .signup(&req.username, &req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let pair = state.sessions.login(&req.username, &req.password).await?;

    Ok((StatusCode::OK, Json(pair)))
}

async fn refresh(
    State(state): State<AuthState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let pair = state.sessions.refresh(&req.refresh_token).await?;

    Ok((StatusCode::OK, Json(pair)))
}

async fn logout(
    State(state): State<AuthState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    state.sessions.logout(&req.refresh_token).await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))))
}

async fn me(
    State(state): State<AuthState>,
    CurrentUser(identity): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.sessions.me(&identity).await?;
    Ok((StatusCode::OK, Json(user)))
}
