//! End-to-end tests for oauthd
//!
//! Drives the full router over file-backed SQLite storage: register a client,
//! obtain a token at /token, present it at the protected endpoints.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use oauthd::auth::{GrantedScopeAuthorizer, TokenRequest};
use oauthd::config::ServerSettings;
use oauthd::http::build_router;
use oauthd::storage::{ClientStore, SqliteStorage, TokenStore};
use oauthd::utils::TestEnvironment;
use oauthd::{AuthorizationServer, OAuthError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn settings(lifetime_secs: u64) -> ServerSettings {
    ServerSettings {
        token_lifetime: Duration::from_secs(lifetime_secs),
        ..Default::default()
    }
}

async fn call(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn token_request(body: &str, basic: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(basic) = basic {
        builder = builder.header(header::AUTHORIZATION, format!("Basic {}", basic));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn protected(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_client_credentials_round_trip() {
    let env = TestEnvironment::new().await;
    env.register_client("000000", "999999", "read").await;
    let router = build_router(env.server(settings(7200)));

    let (status, body) = call(
        &router,
        token_request(
            "grant_type=client_credentials&client_id=000000&client_secret=999999&scope=read",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert!(body["expires_in"].as_i64().unwrap() > 0);

    let (status, body) = call(&router, protected("/test", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_id"], "000000");
    assert_eq!(body["scope"], "read");

    // Persisted row carries the derived index columns
    let row = env.storage.get_by_access(&token).await.unwrap().unwrap();
    assert_eq!(row.client_id, "000000");
    assert_eq!(row.data.access, token);
}

#[tokio::test]
async fn test_zero_lifetime_token_is_rejected() {
    let env = TestEnvironment::new().await;
    env.register_client("000000", "999999", "read").await;
    let router = build_router(env.server(settings(0)));

    let (status, body) = call(
        &router,
        token_request(
            "grant_type=client_credentials&client_id=000000&client_secret=999999",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expires_in"], 0);
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = call(&router, protected("/test", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "expired_token");

    // Expired rows are not purged
    assert!(env.storage.get_by_access(&token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_basic_credentials_take_priority_over_form() {
    let env = TestEnvironment::new().await;
    env.register_client("000000", "999999", "read").await;
    let router = build_router(env.server(settings(7200)));

    // base64("000000:999999") with a wrong secret in the form body
    let (status, body) = call(
        &router,
        token_request(
            "grant_type=client_credentials&client_id=000000&client_secret=wrong",
            Some("MDAwMDAwOjk5OTk5OQ=="),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    // base64("000000:wrong") with the correct secret in the form body
    let (status, body) = call(
        &router,
        token_request(
            "grant_type=client_credentials&client_id=000000&client_secret=999999",
            Some("MDAwMDAwOndyb25n"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "invalid_client");
}

#[tokio::test]
async fn test_unregistered_client_is_rejected() {
    let env = TestEnvironment::new().await;
    let router = build_router(env.server(settings(7200)));

    let (status, body) = call(
        &router,
        token_request(
            "grant_type=client_credentials&client_id=nobody&client_secret=x",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "invalid_client");
}

#[tokio::test]
async fn test_tokens_survive_reopen() {
    let env = TestEnvironment::new().await;
    env.register_client("000000", "999999", "read").await;
    let server = env.server(settings(7200));

    let request = TokenRequest::default()
        .with_param("grant_type", "client_credentials")
        .with_basic_auth("000000", "999999");
    let issued = server.handle_token_request(&request).await.unwrap();

    let reopened = SqliteStorage::new(env.db_path.to_str().unwrap(), Duration::from_secs(5))
        .await
        .unwrap();
    let reopened = AuthorizationServer::new(settings(7200), Arc::new(reopened));

    let descriptor = reopened.validate_bearer(&issued.access_token).await.unwrap();
    assert_eq!(descriptor.client_id, "000000");
    assert!(reopened.storage().get_client("000000").await.unwrap().is_some());
}

#[tokio::test]
async fn test_granted_scope_policy() {
    let env = TestEnvironment::new().await;
    env.register_client("000000", "999999", "read").await;
    let server = Arc::new(
        AuthorizationServer::new(settings(7200), env.storage.clone())
            .with_scope_authorizer(Arc::new(GrantedScopeAuthorizer)),
    );

    let request = TokenRequest::default()
        .with_param("grant_type", "client_credentials")
        .with_param("scope", "read write")
        .with_basic_auth("000000", "999999");
    let err = server.handle_token_request(&request).await.unwrap_err();
    assert_eq!(err.as_oauth(), Some(&OAuthError::InvalidScope));

    let request = TokenRequest::default()
        .with_param("grant_type", "client_credentials")
        .with_basic_auth("000000", "999999");
    let issued = server.handle_token_request(&request).await.unwrap();
    assert_eq!(issued.scope.as_deref(), Some("read"));
}

#[tokio::test]
async fn test_config_driven_storage() {
    let env = TestEnvironment::new().await;
    env.register_client("000000", "999999", "read").await;

    let config = env.config();
    let storage = oauthd::storage::create_storage_from_config(&config.storage)
        .await
        .unwrap();
    let server = AuthorizationServer::new(config.server_settings(), storage);

    let client = server.authenticate_client("000000", "999999").await.unwrap();
    assert_eq!(client.scope, "read");
}
