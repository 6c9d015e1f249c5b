#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chinook_auth::{ServerConfig, create_app, db::Database};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const CLIENT_IP: &str = "203.0.113.10";
const TEST_BCRYPT_COST: u32 = 4;

pub async fn test_config(auth_rate_limit: u32) -> ServerConfig {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    ServerConfig {
        db,
        jwt_secret: JWT_SECRET.to_vec(),
        api_version: "v1".to_string(),
        bcrypt_cost: TEST_BCRYPT_COST,
        auth_rate_limit: NonZeroU32::new(auth_rate_limit).unwrap(),
        request_timeout: Duration::from_secs(30),
        trust_forwarded_for: true,
    }
}

pub async fn create_test_app() -> Router {
    create_app(&test_config(1000).await).expect("Failed to build app")
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Send a request and return the status with the parsed JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub async fn signup(app: &Router, username: &str, password: &str) -> Value {
    let body = serde_json::json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": password,
    });
    let (status, json) = send(app, post_json("/api/v1/auth/signup", &body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", json);
    json
}

/// Log in and return (access token, refresh token).
pub async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let body = serde_json::json!({ "username": username, "password": password });
    let (status, json) = send(app, post_json("/api/v1/auth/login", &body.to_string())).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", json);
    (
        json["token"].as_str().unwrap().to_string(),
        json["refresh_token"].as_str().unwrap().to_string(),
    )
}
