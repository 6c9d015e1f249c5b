mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{
    JWT_SECRET, create_test_app, get_with_token, login, post_json, send, signup, test_config,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::{SystemTime, UNIX_EPOCH};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn refresh_body(token: &str) -> String {
    serde_json::json!({ "refresh_token": token }).to_string()
}

#[tokio::test]
async fn test_full_session_scenario() {
    let app = create_test_app().await;

    let created = signup(&app, "alice", "password1").await;
    assert_eq!(created["username"], "alice");
    assert_eq!(created["email"], "alice@example.com");
    assert!(created["id"].as_i64().is_some());
    assert!(created.get("password").is_none());
    assert!(created.get("password_hash").is_none());

    let (token, refresh1) = login(&app, "alice", "password1").await;

    let (status, me) = send(&app, get_with_token("/api/v1/auth/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["id"], created["id"]);

    let (status, pair) = send(
        &app,
        post_json("/api/v1/auth/refresh", &refresh_body(&refresh1)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refresh2 = pair["refresh_token"].as_str().unwrap().to_string();
    let token2 = pair["token"].as_str().unwrap().to_string();
    assert_ne!(refresh1, refresh2);

    // The rotated-out token is dead.
    let (status, json) = send(
        &app,
        post_json("/api/v1/auth/refresh", &refresh_body(&refresh1)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "invalid or expired refresh token");

    let (status, me) = send(&app, get_with_token("/api/v1/auth/me", &token2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");

    let (status, json) = send(
        &app,
        post_json("/api/v1/auth/logout", &refresh_body(&refresh2)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, _) = send(
        &app,
        post_json("/api/v1/auth/refresh", &refresh_body(&refresh2)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_conflicts() {
    let app = create_test_app().await;
    signup(&app, "alice", "password1").await;

    let (status, json) = send(
        &app,
        post_json(
            "/api/v1/auth/signup",
            r#"{"username":"alice","email":"other@example.com","password":"password1"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "username or email already exists");

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/auth/signup",
            r#"{"username":"bob","email":"ALICE@example.com","password":"password1"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation() {
    let app = create_test_app().await;

    let cases = [
        r#"{"username":"al","email":"al@example.com","password":"password1"}"#,
        r#"{"username":"alice","email":"not-an-email","password":"password1"}"#,
        r#"{"username":"alice","email":"alice@example.com","password":"short"}"#,
    ];

    for body in cases {
        let (status, json) = send(&app, post_json("/api/v1/auth/signup", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(json["error"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_test_app().await;

    for body in [r#"{"username": "#, r#"{"username":"alice"}"#, "[]"] {
        let (status, json) = send(&app, post_json("/api/v1/auth/login", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json["error"], "invalid request");
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_test_app().await;
    signup(&app, "alice", "password1").await;

    let (status_wrong, wrong) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            r#"{"username":"alice","password":"wrong-password"}"#,
        ),
    )
    .await;
    let (status_unknown, unknown) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            r#"{"username":"nobody","password":"password1"}"#,
        ),
    )
    .await;

    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/api/v1/auth/me")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "missing token");

    let (status, json) = send(&app, get_with_token("/api/v1/auth/me", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "invalid token");
}

#[tokio::test]
async fn test_expired_access_token_is_rejected() {
    let app = create_test_app().await;
    signup(&app, "alice", "password1").await;

    let issued = now() - 2 * 86_400;
    let claims = serde_json::json!({ "sub": "alice", "iat": issued, "exp": now() - 1 });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET),
    )
    .unwrap();

    let (status, json) = send(&app, get_with_token("/api/v1/auth/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "invalid token");
}

#[tokio::test]
async fn test_tampered_access_token_is_rejected() {
    let app = create_test_app().await;
    signup(&app, "alice", "password1").await;
    signup(&app, "mallory", "password1").await;
    let (token, _) = login(&app, "mallory", "password1").await;

    let forged_claims = serde_json::json!({ "sub": "alice", "iat": now(), "exp": now() + 3600 });
    let forged_payload = {
        use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
        URL_SAFE_NO_PAD.encode(forged_claims.to_string())
    };
    let parts: Vec<&str> = token.split('.').collect();
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    let (status, _) = send(&app, get_with_token("/api/v1/auth/me", &forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_for_deleted_user_is_not_found() {
    let config = test_config(1000).await;
    let db = config.db.clone();
    let app = chinook_auth::create_app(&config).unwrap();

    signup(&app, "alice", "password1").await;
    let (token, _) = login(&app, "alice", "password1").await;

    sqlx::query("DELETE FROM users WHERE username = 'alice'")
        .execute(db.pool())
        .await
        .unwrap();

    let (status, json) = send(&app, get_with_token("/api/v1/auth/me", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "user not found");
}

#[tokio::test]
async fn test_concurrent_refresh_has_single_winner() {
    let app = create_test_app().await;
    signup(&app, "alice", "password1").await;
    let (_, refresh) = login(&app, "alice", "password1").await;

    let body = refresh_body(&refresh);
    let attempts = (0..6).map(|_| send(&app, post_json("/api/v1/auth/refresh", &body)));
    let results = futures::future::join_all(attempts).await;

    let winners = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::OK)
        .count();
    let losers = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::UNAUTHORIZED)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(losers, 5);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = create_test_app().await;
    signup(&app, "alice", "password1").await;
    let (_, refresh) = login(&app, "alice", "password1").await;

    for _ in 0..2 {
        let (status, json) = send(
            &app,
            post_json("/api/v1/auth/logout", &refresh_body(&refresh)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    let (status, _) = send(
        &app,
        post_json("/api/v1/auth/logout", &refresh_body("never-issued")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_empty_and_unknown_tokens() {
    let app = create_test_app().await;

    let (status, _) = send(&app, post_json("/api/v1/auth/refresh", &refresh_body(""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        post_json("/api/v1/auth/refresh", &refresh_body("never-issued")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "invalid or expired refresh token");
}

#[tokio::test]
async fn test_logout_storage_failure_is_internal_error() {
    let config = test_config(1000).await;
    let db = config.db.clone();
    let app = chinook_auth::create_app(&config).unwrap();

    signup(&app, "alice", "password1").await;
    let (_, refresh) = login(&app, "alice", "password1").await;

    sqlx::query(
        "CREATE TRIGGER block_delete BEFORE DELETE ON refresh_tokens
         BEGIN SELECT RAISE(ABORT, 'delete blocked'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let (status, json) = send(
        &app,
        post_json("/api/v1/auth/logout", &refresh_body(&refresh)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "could not revoke refresh token");
    assert!(db.refresh_tokens().get(&refresh).await.is_ok());
}
