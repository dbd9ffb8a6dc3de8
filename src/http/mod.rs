//! HTTP server for oauthd
//!
//! Token endpoint, bearer-protected test endpoints, revocation and the usual
//! health/metrics probes. The `AuthorizationServer` is the router state.

use crate::auth::{AuthenticatedClient, AuthorizationServer, TokenRequest};
use crate::config::{Config, HttpConfig};
use crate::constants::PARAM_TOKEN;
use crate::storage::ClientStore;
use crate::{OAuthError, OauthdError, Result};
use axum::{
    Form, Router,
    extract::{Json, Query, State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    LatencyUnit,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

type Params = HashMap<String, String>;

/// Error rendered as `{"message": "<error>"}` with the given status
///
/// Protocol errors are echoed by code; anything else is logged and reported
/// as `server_error`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: OauthdError,
}

impl AppError {
    pub fn new(status: StatusCode, error: impl Into<OauthdError>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.error.as_oauth().is_none() {
            // Log full error details internally
            tracing::error!(error = ?self.error, "Internal error");
        }

        let message = self.error.public_message();
        tracing::debug!(status = %self.status, message = %message, "HTTP error response");

        (self.status, Json(json!({ "message": message }))).into_response()
    }
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let http_config = config.http_config();

    let storage = crate::storage::create_storage_from_config(&config.storage).await?;
    let server = Arc::new(AuthorizationServer::new(config.server_settings(), storage));

    serve(server, &http_config).await
}

/// Serve an already-built authorization server
pub async fn serve(server: Arc<AuthorizationServer>, http_config: &HttpConfig) -> Result<()> {
    let app = build_router(server);

    // Determine bind address
    let addr = format!("{}:{}", http_config.host, http_config.port);
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| OauthdError::config(format!("Invalid address {}: {}", addr, e)))?;

    tracing::info!("Starting HTTP server on {}", socket_addr);

    let listener = tokio::net::TcpListener::bind(socket_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| OauthdError::config(format!("Server error: {}", e)))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Build the router with all endpoints
pub fn build_router(server: Arc<AuthorizationServer>) -> Router {
    Router::new()
        // OAuth2 endpoints
        .route("/token", post(token_handler).get(token_handler))
        .route("/revoke", post(revoke_handler))
        // Bearer-protected endpoints
        .route("/test", get(test_handler))
        .route("/test2", get(test2_handler))
        // System endpoints
        .route("/ping", get(ping_handler))
        .route("/healthz", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(server)
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new())
                    .on_response(
                        DefaultOnResponse::new()
                            .level(tracing::Level::INFO)
                            .latency_unit(LatencyUnit::Micros),
                    ),
            ),
        )
}

// ============================================================================
// OAUTH2 HANDLERS
// ============================================================================

/// Token endpoint
///
/// Failures are reported with status 200 and a `message` body.
async fn token_handler(
    State(server): State<Arc<AuthorizationServer>>,
    headers: HeaderMap,
    Query(query): Query<Params>,
    form: std::result::Result<Form<Params>, FormRejection>,
) -> Response {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let request = TokenRequest::from_parts(headers, query, form);

    match server.handle_token_request(&request).await {
        Ok(token) => (
            StatusCode::OK,
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::PRAGMA, "no-cache"),
            ],
            Json(token),
        )
            .into_response(),
        Err(e) => AppError::new(StatusCode::OK, e).into_response(),
    }
}

/// Token revocation (RFC 7009)
///
/// Storage timeouts answer 503 so the caller can retry.
async fn revoke_handler(
    State(server): State<Arc<AuthorizationServer>>,
    Query(query): Query<Params>,
    form: std::result::Result<Form<Params>, FormRejection>,
) -> std::result::Result<Json<Value>, AppError> {
    let mut params = query;
    params.extend(form.map(|Form(f)| f).unwrap_or_default());

    let token = params
        .get(PARAM_TOKEN)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::new(
                StatusCode::BAD_REQUEST,
                OAuthError::InvalidRequest(PARAM_TOKEN.to_string()),
            )
        })?;

    // Unknown tokens still answer 200; a store failure must not look like success
    server.revoke(token).await.map_err(|e| {
        let status = if e.is_transient() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        AppError::new(status, e)
    })?;

    Ok(Json(json!({})))
}

/// Bearer-protected echo of the presented token
async fn test_handler(AuthenticatedClient(token): AuthenticatedClient) -> Json<Value> {
    Json(json!({
        "expires_in": token.expires_in_secs(),
        "client_id": token.client_id,
        "scope": token.scope,
    }))
}

/// Bearer-protected echo that also resolves the owning client
async fn test2_handler(
    State(server): State<Arc<AuthorizationServer>>,
    AuthenticatedClient(token): AuthenticatedClient,
) -> std::result::Result<Json<Value>, AppError> {
    let client = crate::storage::with_deadline(
        server.settings().store_timeout,
        server.storage().get_client(&token.client_id),
    )
    .await
    .map_err(|e| AppError::new(StatusCode::BAD_REQUEST, e))?
    .ok_or_else(|| AppError::new(StatusCode::BAD_REQUEST, OAuthError::InvalidClient))?;

    Ok(Json(json!({
        "expires_in": token.expires_in_secs(),
        "client_id": token.client_id,
        "scope": token.scope,
        "granted_scopes": client.scopes(),
    })))
}

// ============================================================================
// SYSTEM HANDLERS
// ============================================================================

async fn ping_handler() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_handler() -> std::result::Result<(StatusCode, String), AppError> {
    let metrics = crate::telemetry::get_metrics()
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok((StatusCode::OK, metrics))
}

#[cfg(test)]
mod http_test;
