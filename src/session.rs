//! Signup, login, refresh, logout and current-identity flows.
//!
//! `SessionService` ties the credential store, password hasher, token issuer
//! and refresh token store together. It knows nothing about HTTP; handlers in
//! `api::auth` translate [`SessionError`] into responses.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::Identity;
use crate::db::{Database, PublicUser, StoreError};
use crate::jwt::{JwtConfig, REFRESH_TOKEN_DURATION_SECS, now_secs};
use crate::password::PasswordHasher;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
/// bcrypt only looks at the first 72 bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

const INVALID_CREDENTIALS: &str = "invalid username or password";
const INVALID_REFRESH_TOKEN: &str = "invalid or expired refresh token";

/// Failure kinds surfaced by the session flows.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    /// Store, hashing or signing failure. Details are logged, not returned.
    #[error("{0}")]
    Internal(&'static str),
}

/// Access and refresh token handed to the client after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionService {
    db: Database,
    jwt: Arc<JwtConfig>,
    hasher: Arc<PasswordHasher>,
}

impl SessionService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, hasher: Arc<PasswordHasher>) -> Self {
        Self { db, jwt, hasher }
    }

    /// Register a new user. The response never carries the digest.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, SessionError> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| {
                error!(error = %e, "Password hashing task failed");
                SessionError::Internal("could not hash password")
            })?
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                SessionError::Internal("could not hash password")
            })?;

        let id = match self.db.users().create(username, email, &digest).await {
            Ok(id) => id,
            Err(StoreError::Conflict) => {
                return Err(SessionError::Conflict("username or email already exists"));
            }
            Err(e) => {
                error!(error = %e, "Failed to create user");
                return Err(SessionError::Internal("could not create user"));
            }
        };

        info!(user_id = id, username = %username, "User created");

        Ok(PublicUser {
            id,
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    /// Verify credentials and start a session.
    ///
    /// Unknown usernames and wrong passwords produce the same error and take
    /// a comparable amount of time.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, SessionError> {
        validate_username(username)?;
        validate_password(password)?;

        let user = match self.db.users().get_by_username(username).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(e) => {
                error!(error = %e, "Failed to look up user");
                return Err(SessionError::Internal("could not look up user"));
            }
        };

        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        let digest = user.as_ref().map(|u| u.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => hasher.verify(&plaintext, &digest),
            None => hasher.verify_dummy(&plaintext),
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Password verification task failed");
            SessionError::Internal("could not verify password")
        })?;

        let user = match user {
            Some(user) if verified => user,
            _ => {
                warn!(username = %username, "Failed login attempt");
                return Err(SessionError::Unauthorized(INVALID_CREDENTIALS));
            }
        };

        let pair = self.issue_pair(&user.username).await?;
        info!(username = %user.username, "User logged in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The presented token is retired and its replacement stored in one
    /// transaction, so of several concurrent requests with the same token
    /// only one wins, and a failed insert leaves the old token usable.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        if refresh_token.is_empty() {
            return Err(SessionError::Validation(
                "refresh_token is required".to_string(),
            ));
        }

        let replacement = self.jwt.generate_refresh_token();
        let now = self.now()?;
        let expires_at = now + REFRESH_TOKEN_DURATION_SECS as i64;

        let consumed = match self
            .db
            .refresh_tokens()
            .rotate(refresh_token, &replacement, now, expires_at)
            .await
        {
            Ok(token) => token,
            Err(StoreError::NotFound | StoreError::Expired) => {
                return Err(SessionError::Unauthorized(INVALID_REFRESH_TOKEN));
            }
            Err(e) => {
                error!(error = %e, "Failed to rotate refresh token");
                return Err(SessionError::Internal("could not refresh session"));
            }
        };

        Ok(TokenPair {
            token: self.access_token(&consumed.username)?,
            refresh_token: replacement,
        })
    }

    /// Revoke a refresh token. Revoking an absent token succeeds.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        match self.db.refresh_tokens().delete(refresh_token).await {
            Ok(true) => info!("Refresh token revoked"),
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "Failed to delete refresh token");
                return Err(SessionError::Internal("could not revoke refresh token"));
            }
        }
        Ok(())
    }

    /// Load the user behind a verified identity.
    pub async fn me(&self, identity: &Identity) -> Result<PublicUser, SessionError> {
        match self.db.users().get_by_username(&identity.username).await {
            Ok(user) => Ok(PublicUser::from(user)),
            Err(StoreError::NotFound) => Err(SessionError::NotFound("user not found")),
            Err(e) => {
                error!(error = %e, "Failed to look up user");
                Err(SessionError::Internal("could not look up user"))
            }
        }
    }

    /// Issue an access token and persist a fresh refresh token for `username`.
    async fn issue_pair(&self, username: &str) -> Result<TokenPair, SessionError> {
        let token = self.access_token(username)?;

        let refresh_token = self.jwt.generate_refresh_token();
        let expires_at = self.now()? + REFRESH_TOKEN_DURATION_SECS as i64;

        self.db
            .refresh_tokens()
            .save(&refresh_token, username, expires_at)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store refresh token");
                SessionError::Internal("could not save refresh token")
            })?;

        Ok(TokenPair {
            token,
            refresh_token,
        })
    }

    fn access_token(&self, username: &str) -> Result<String, SessionError> {
        self.jwt.generate_access_token(username).map_err(|e| {
            error!(error = %e, "Failed to generate access token");
            SessionError::Internal("could not generate token")
        })
    }

    fn now(&self) -> Result<i64, SessionError> {
        now_secs().map(|s| s as i64).map_err(|e| {
            error!(error = %e, "Clock error");
            SessionError::Internal("clock error")
        })
    }
}

fn validate_username(username: &str) -> Result<(), SessionError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(SessionError::Validation(format!(
            "username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), SessionError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SessionError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(SessionError::Validation(format!(
            "password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), SessionError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(SessionError::Validation("email is not valid".to_string()))
    }
}

/// Structural email check: `local@domain.tld`, no whitespace, one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}
