//! Authentication middleware and extractor.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::bearer::bearer_token;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::types::Identity;
use crate::jwt::JwtConfig;

/// Middleware guarding protected routes.
///
/// Rejects with 401 before the handler runs if the bearer token is missing
/// or fails validation. On success the verified [`Identity`] is inserted into
/// the request extensions.
pub async fn require_auth(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiAuthError> {
    let token =
        bearer_token(request.headers()).ok_or(ApiAuthError::new(AuthErrorKind::MissingToken))?;

    let claims = jwt.validate_access_token(token).map_err(|e| {
        debug!(error = %e, "Rejected access token");
        ApiAuthError::new(AuthErrorKind::InvalidToken)
    })?;

    request.extensions_mut().insert(Identity { username: claims.sub });

    Ok(next.run(request).await)
}

/// Extractor for the identity verified by [`require_auth`].
/// Rejects with 401 when the route was not behind the middleware.
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))
    }
}
