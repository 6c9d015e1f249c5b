//! Refresh token storage.
//!
//! Refresh tokens are opaque random strings keyed by their own value.
//! Access tokens are stateless and never stored.

use sqlx::sqlite::SqlitePool;

use super::StoreError;

/// A stored refresh token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub username: String,
    /// Absolute expiry (Unix seconds).
    pub expires_at: i64,
}

impl RefreshToken {
    /// Whether the token has expired at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Store for refresh tokens.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new refresh token. A duplicate token value is an error,
    /// never an overwrite.
    pub async fn save(
        &self,
        token: &str,
        username: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO refresh_tokens (token, username, expires_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(username)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get a refresh token by value.
    pub async fn get(&self, token: &str) -> Result<RefreshToken, StoreError> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT token, username, expires_at FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    /// Delete a refresh token. Deleting an absent token is not an error;
    /// returns whether a row was removed.
    pub async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Exchange `old` for `replacement` in one transaction and return the
    /// consumed row.
    ///
    /// The old row is taken with `DELETE ... RETURNING`, so when several
    /// callers race on the same token exactly one of them gets it and the
    /// rest see `NotFound`. The replacement is inserted for the same owner
    /// before commit; if that insert fails the delete is rolled back and
    /// `old` stays usable. An expired `old` is still deleted and reported as
    /// `Expired`.
    pub async fn rotate(
        &self,
        old: &str,
        replacement: &str,
        now: i64,
        expires_at: i64,
    ) -> Result<RefreshToken, StoreError> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query_as::<_, RefreshToken>(
            "DELETE FROM refresh_tokens WHERE token = ? RETURNING token, username, expires_at",
        )
        .bind(old)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        if consumed.is_expired_at(now) {
            tx.commit().await?;
            return Err(StoreError::Expired);
        }

        sqlx::query("INSERT INTO refresh_tokens (token, username, expires_at) VALUES (?, ?, ?)")
            .bind(replacement)
            .bind(&consumed.username)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(consumed)
    }

    /// Delete all tokens that expired before `now` (Unix seconds).
    pub async fn delete_expired(&self, now: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
