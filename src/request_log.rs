//! Access logging.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

use crate::auth::{bearer_token, extract_client_ip};
use crate::jwt::JwtConfig;

#[derive(Clone, Copy, Debug)]
pub struct RequestLogConfig {
    /// Report the first `X-Forwarded-For` entry as the client IP
    pub trust_forwarded_for: bool,
}

/// Client IP for the log line, or `-` when none can be determined.
fn client_ip_for(request: &Request, trust_forwarded_for: bool) -> String {
    extract_client_ip(request, trust_forwarded_for).unwrap_or_else(|_| "-".to_string())
}

/// Log one line per request. The username is read from the bearer token
/// without verifying it and is only ever used here.
pub async fn log_request(
    State(config): State<RequestLogConfig>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = client_ip_for(&request, config.trust_forwarded_for);
    let username = bearer_token(request.headers()).and_then(JwtConfig::peek_subject_unverified);

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        client_ip = %client_ip,
        username = username.as_deref().unwrap_or("-"),
        "Request"
    );

    response
}
