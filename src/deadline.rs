//! Per-request deadline.
//!
//! Dropping the inner future on expiry cancels any in-flight store call along
//! with the handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::warn;

use crate::api::ApiError;

pub async fn enforce_deadline(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(
                method = %method,
                path = %path,
                timeout_ms = timeout.as_millis() as u64,
                "Request deadline exceeded"
            );
            ApiError::request_timeout("request timed out").into_response()
        }
    }
}
