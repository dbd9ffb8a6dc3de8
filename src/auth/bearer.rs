//! Bearer token extraction for protected routes

use crate::auth::server::AuthorizationServer;
use crate::constants::PARAM_ACCESS_TOKEN;
use crate::model::TokenDescriptor;
use crate::OauthdError;
use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Query},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively; an empty token is treated as absent.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Validated bearer token of the current request
///
/// Rejects with `400 {"message": "<error>"}`.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient(pub TokenDescriptor);

/// Rejection for protected routes
#[derive(Debug)]
pub struct BearerRejection(pub OauthdError);

impl IntoResponse for BearerRejection {
    fn into_response(self) -> Response {
        if self.0.as_oauth().is_none() {
            tracing::error!(error = %self.0, "Bearer validation failed");
        }
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": self.0.public_message() })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for AuthenticatedClient
where
    Arc<AuthorizationServer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = BearerRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let server = Arc::<AuthorizationServer>::from_ref(state);

        let params: HashMap<String, String> = if extract_bearer_token(&parts.headers).is_some() {
            HashMap::new()
        } else {
            Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
                .map(|Query(q)| q)
                .unwrap_or_default()
                .into_iter()
                .filter(|(k, _)| k == PARAM_ACCESS_TOKEN)
                .collect()
        };

        server
            .validate_request(&parts.headers, &params)
            .await
            .map(AuthenticatedClient)
            .map_err(BearerRejection)
    }
}
