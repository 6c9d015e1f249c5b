//! Startup cleanup of expired refresh tokens.

use crate::db::Database;
use crate::jwt::now_secs;
use tracing::{error, info};

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    let now = match now_secs() {
        Ok(now) => now as i64,
        Err(e) => {
            error!(error = %e, "Skipping cleanup");
            return;
        }
    };

    match db.refresh_tokens().delete_expired(now).await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh tokens: {}", e),
    }
}
