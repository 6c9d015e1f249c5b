pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod cors;
pub mod db;
pub mod deadline;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod request_log;
pub mod session;

use api::create_api_router;
use axum::{Router, middleware};
use db::Database;
use jwt::JwtConfig;
use password::{PasswordError, PasswordHasher};
use rate_limit::RateLimitConfig;
use request_log::RequestLogConfig;
use session::SessionService;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{debug, info};

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Version segment of the API prefix (e.g. "v1" for /api/v1)
    pub api_version: String,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// Credential endpoint requests allowed per client IP per minute
    pub auth_rate_limit: NonZeroU32,
    /// Deadline for a single request
    pub request_timeout: Duration,
    /// Key rate limits on X-Forwarded-For (requires running behind a proxy)
    pub trust_forwarded_for: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, PasswordError> {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret));
    let hasher = Arc::new(PasswordHasher::new(config.bcrypt_cost)?);
    debug!(bcrypt_cost = hasher.cost(), "Password hasher ready");
    let sessions = SessionService::new(config.db.clone(), jwt.clone(), hasher);
    let rate_limit = Arc::new(RateLimitConfig::new(
        config.auth_rate_limit,
        config.trust_forwarded_for,
    ));

    let api_router = create_api_router(sessions, jwt, rate_limit);
    let api_path = format!("/api/{}", config.api_version);

    Ok(Router::new()
        .merge(api::health_router())
        .nest(&api_path, api_router)
        .fallback(api::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    RequestLogConfig {
                        trust_forwarded_for: config.trust_forwarded_for,
                    },
                    request_log::log_request,
                ))
                .layer(cors::cors_layer())
                .layer(middleware::from_fn_with_state(
                    config.request_timeout,
                    deadline::enforce_deadline,
                )),
        ))
}

/// Run the server on the given listener until a shutdown signal arrives.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config).map_err(std::io::Error::other)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    cleanup::run_cleanup(&config.db).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
