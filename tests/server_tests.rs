mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chinook_auth::{create_app, start_server};
use common::{create_test_app, post_json, send, signup, test_config};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

#[tokio::test]
async fn test_health() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = create_test_app().await;

    for uri in ["/nope", "/api/v1/auth/nope", "/api/v2/auth/login"] {
        let (status, json) = send(
            &app,
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "uri: {}", uri);
        assert_eq!(json["error"], "resource not found");
    }
}

#[tokio::test]
async fn test_api_version_prefix_is_configurable() {
    let mut config = test_config(1000).await;
    config.api_version = "v2".to_string();
    let app = create_app(&config).unwrap();

    let (status, _) = send(
        &app,
        post_json(
            "/api/v2/auth/signup",
            r#"{"username":"alice","email":"alice@example.com","password":"password1"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            r#"{"username":"alice","password":"password1"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_credential_endpoints_are_rate_limited() {
    let app = create_app(&test_config(3).await).unwrap();
    signup(&app, "alice", "password1").await;

    let body = r#"{"username":"alice","password":"wrong-password"}"#;
    for _ in 0..2 {
        let (status, _) = send(&app, post_json("/api/v1/auth/login", body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, json) = send(&app, post_json("/api/v1/auth/login", body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(json["error"].as_str().is_some());

    // Logout is not part of the limited group.
    let (status, _) = send(
        &app,
        post_json("/api/v1/auth/logout", r#"{"refresh_token":"x"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight_on_api_route() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/v1/auth/me")
                .header("origin", "https://music.example")
                .header("access-control-request-method", "GET")
                .header("access-control-request-headers", "authorization")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_start_server_serves_over_tcp() {
    let config = test_config(1000).await;
    let (handle, addr) = start_server(config, 0).await.unwrap();

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got: {}", response);
    assert!(response.contains(r#"{"status":"ok"}"#));

    handle.abort();
}
