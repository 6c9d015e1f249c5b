//! Authorization header parsing.

use axum::http::{HeaderMap, header};

const BEARER_PREFIX: &str = "bearer ";

/// Extract the access token from the `Authorization` header.
///
/// Accepts `Bearer <token>` (prefix matched case-insensitively) and falls
/// back to the raw header value when no prefix is present. Returns `None`
/// if the header is missing, not valid ASCII, or empty after trimming.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim_start();

    let token = match value.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => {
            value[BEARER_PREFIX.len()..].trim()
        }
        _ => value.trim(),
    };

    // A bare scheme with the trailing space stripped in transit
    if token.is_empty() || token.eq_ignore_ascii_case(BEARER_PREFIX.trim_end()) {
        None
    } else {
        Some(token)
    }
}
