//! Authorization server core
//!
//! Orchestrates credential extraction, client verification, scope
//! authorization and the token store to issue, validate and revoke bearer
//! access tokens.

use crate::auth::credentials::{ChainExtractor, ClientCredentialsExtractor, TokenRequest};
use crate::auth::scope::{AllowAllScopes, ScopeAuthorizer};
use crate::config::ServerSettings;
use crate::constants::{self, *};
use crate::model::*;
use crate::storage::{ClientStore, Storage, TokenStore, with_deadline};
use crate::telemetry;
use crate::{OAuthError, OauthdError, Result};
use async_trait::async_trait;
use axum::http::HeaderMap;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Verifies resource owner credentials for the password grant
#[async_trait]
pub trait PasswordAuthenticator: Send + Sync {
    /// Returns the user id on success, `None` when the credentials are rejected
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<String>>;
}

/// Rejects every resource owner; the password grant is off until replaced
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllUsers;

#[async_trait]
impl PasswordAuthenticator for DenyAllUsers {
    async fn authenticate(&self, username: &str, _password: &str) -> Result<Option<String>> {
        tracing::debug!(username, "Password grant refused: no password authenticator installed");
        Ok(None)
    }
}

/// OAuth2 authorization server
///
/// Constructed once at startup and shared behind an `Arc`; holds no
/// per-request mutable state.
pub struct AuthorizationServer {
    settings: ServerSettings,
    storage: Arc<dyn Storage>,
    extractor: Arc<dyn ClientCredentialsExtractor>,
    scope_authorizer: Arc<dyn ScopeAuthorizer>,
    password_authenticator: Arc<dyn PasswordAuthenticator>,
}

impl AuthorizationServer {
    /// Server with the default Basic-then-form extractor, allow-all scope
    /// policy and no password grant users
    pub fn new(settings: ServerSettings, storage: Arc<dyn Storage>) -> Self {
        Self {
            settings,
            storage,
            extractor: Arc::new(ChainExtractor::default()),
            scope_authorizer: Arc::new(AllowAllScopes),
            password_authenticator: Arc::new(DenyAllUsers),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ClientCredentialsExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_scope_authorizer(mut self, authorizer: Arc<dyn ScopeAuthorizer>) -> Self {
        self.scope_authorizer = authorizer;
        self
    }

    pub fn with_password_authenticator(
        mut self,
        authenticator: Arc<dyn PasswordAuthenticator>,
    ) -> Self {
        self.password_authenticator = authenticator;
        self
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    // ------------------------------------------------------------------
    // Token endpoint
    // ------------------------------------------------------------------

    /// Handle a token endpoint request end to end
    pub async fn handle_token_request(&self, request: &TokenRequest) -> Result<TokenResponse> {
        match self.process_token_request(request).await {
            Ok((grant_type, response)) => {
                telemetry::record_token_issued(grant_type.as_str());
                Ok(response)
            }
            Err(e) => {
                let code = e.public_message();
                telemetry::record_token_request_failed(&code);
                match e.as_oauth() {
                    Some(oauth) => tracing::info!(error = %oauth, "Token request rejected"),
                    None => tracing::error!(error = %e, "Token request failed"),
                }
                Err(e)
            }
        }
    }

    async fn process_token_request(
        &self,
        request: &TokenRequest,
    ) -> Result<(GrantType, TokenResponse)> {
        let grant_type: GrantType = request
            .param(PARAM_GRANT_TYPE)
            .ok_or_else(|| OAuthError::InvalidRequest(PARAM_GRANT_TYPE.to_string()))?
            .parse()?;

        let credentials = self.extractor.extract(request).map_err(|e| {
            tracing::debug!(error = %e, "Client credentials not presented");
            OAuthError::InvalidClient
        })?;

        let client = self
            .authenticate_client(&credentials.client_id, &credentials.client_secret)
            .await?;

        let mut token_request = TokenGenerateRequest::new(
            grant_type,
            &credentials.client_id,
            &credentials.client_secret,
            request.param(PARAM_SCOPE).unwrap_or_default(),
        );

        match grant_type {
            GrantType::ClientCredentials => {}
            GrantType::Password => {
                let username = request
                    .param(PARAM_USERNAME)
                    .ok_or_else(|| OAuthError::InvalidRequest(PARAM_USERNAME.to_string()))?;
                let password = request
                    .param(PARAM_PASSWORD)
                    .ok_or_else(|| OAuthError::InvalidRequest(PARAM_PASSWORD.to_string()))?;

                token_request.user_id = self
                    .password_authenticator
                    .authenticate(username, password)
                    .await?
                    .ok_or(OAuthError::AccessDenied)?;
            }
            GrantType::AuthorizationCode => {
                let code = request
                    .param(PARAM_CODE)
                    .ok_or_else(|| OAuthError::InvalidRequest(PARAM_CODE.to_string()))?;
                with_deadline(self.settings.store_timeout, self.storage.get_by_code(code)).await?;
                return Err(OauthdError::unsupported("authorization_code grant"));
            }
            GrantType::RefreshToken => {
                let refresh = request
                    .param(PARAM_REFRESH_TOKEN)
                    .ok_or_else(|| OAuthError::InvalidRequest(PARAM_REFRESH_TOKEN.to_string()))?;
                with_deadline(
                    self.settings.store_timeout,
                    self.storage.get_by_refresh(refresh),
                )
                .await?;
                return Err(OauthdError::unsupported("refresh_token grant"));
            }
        }

        let info = self.authorize_and_generate(&client, token_request).await?;
        Ok((grant_type, token_response(&info)))
    }

    /// Run the scope hook for an authenticated client, then persist the token
    async fn authorize_and_generate(
        &self,
        client: &Client,
        mut request: TokenGenerateRequest,
    ) -> Result<TokenInfo> {
        if !self.scope_authorizer.authorize(client, &mut request) {
            return Err(OAuthError::InvalidScope.into());
        }
        self.generate_token(&request).await
    }

    /// Resolve a client and verify its secret
    ///
    /// Unknown clients and wrong secrets are both `invalid_client`; storage
    /// failures propagate unchanged.
    pub async fn authenticate_client(&self, client_id: &str, client_secret: &str) -> Result<Client> {
        let client = with_deadline(self.settings.store_timeout, self.storage.get_client(client_id))
            .await?
            .ok_or_else(|| {
                tracing::debug!(client_id, "Unknown client");
                OAuthError::InvalidClient
            })?;

        if client
            .secret
            .as_bytes()
            .ct_eq(client_secret.as_bytes())
            .unwrap_u8()
            == 0
        {
            tracing::debug!(client_id, "Client secret mismatch");
            return Err(OAuthError::InvalidClient.into());
        }

        Ok(client)
    }

    /// Issue a token for an already-built generation request
    ///
    /// Only the client credentials and password grants issue directly; the
    /// client is verified and the scope hook applied before anything is
    /// persisted.
    pub async fn issue(&self, request: &TokenGenerateRequest) -> Result<TokenResponse> {
        match request.grant_type {
            GrantType::ClientCredentials | GrantType::Password => {}
            GrantType::AuthorizationCode => {
                return Err(OauthdError::unsupported("authorization_code grant"));
            }
            GrantType::RefreshToken => {
                return Err(OauthdError::unsupported("refresh_token grant"));
            }
        }

        let client = self
            .authenticate_client(&request.client_id, &request.client_secret)
            .await?;
        let info = self.authorize_and_generate(&client, request.clone()).await?;
        telemetry::record_token_issued(request.grant_type.as_str());
        Ok(token_response(&info))
    }

    async fn generate_token(&self, request: &TokenGenerateRequest) -> Result<TokenInfo> {
        let info = TokenInfo {
            client_id: request.client_id.clone(),
            user_id: request.user_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scope: request.scope.clone(),
            access: generate_access_token(),
            access_create_at: Utc::now(),
            access_expires_in: request
                .access_token_exp
                .unwrap_or(self.settings.token_lifetime),
        };

        with_deadline(self.settings.store_timeout, self.storage.create(&info)).await?;

        tracing::info!(
            client_id = %info.client_id,
            grant_type = %request.grant_type,
            expires_in = info.access_expires_in.as_secs(),
            "Access token issued"
        );

        Ok(info)
    }

    // ------------------------------------------------------------------
    // Bearer validation
    // ------------------------------------------------------------------

    /// Validate a presented bearer token
    pub async fn validate_bearer(&self, access: &str) -> Result<TokenDescriptor> {
        let outcome = self.lookup_bearer(access).await;
        let label = match &outcome {
            Ok(_) => "valid",
            Err(OauthdError::OAuth(OAuthError::ExpiredToken)) => "expired",
            Err(OauthdError::OAuth(_)) => "invalid",
            Err(_) => "error",
        };
        telemetry::record_token_validation(label);
        outcome
    }

    async fn lookup_bearer(&self, access: &str) -> Result<TokenDescriptor> {
        if access.is_empty() {
            return Err(OAuthError::InvalidToken.into());
        }

        let token = with_deadline(self.settings.store_timeout, self.storage.get_by_access(access))
            .await?
            .ok_or(OAuthError::InvalidToken)?;

        // The store never filters by expiry; `data` is the authoritative record
        let expires_at = token.data.expires_at();
        let now = Utc::now();
        if now >= expires_at {
            tracing::debug!(client_id = %token.client_id, "Bearer token expired");
            return Err(OAuthError::ExpiredToken.into());
        }

        let data = token.data;
        Ok(TokenDescriptor {
            access_token: data.access,
            client_id: data.client_id,
            user_id: data.user_id,
            scope: data.scope,
            created_at: data.access_create_at,
            expires_in: data.access_expires_in,
            remaining_lifetime: expires_at - now,
        })
    }

    /// Validate the bearer token of a protected request
    ///
    /// `Authorization: Bearer` wins over an `access_token` parameter.
    pub async fn validate_request(
        &self,
        headers: &HeaderMap,
        params: &HashMap<String, String>,
    ) -> Result<TokenDescriptor> {
        let token = crate::auth::bearer::extract_bearer_token(headers)
            .or_else(|| {
                params
                    .get(PARAM_ACCESS_TOKEN)
                    .map(String::as_str)
                    .filter(|t| !t.is_empty())
            })
            .ok_or(OAuthError::InvalidToken)?;

        self.validate_bearer(token).await
    }

    /// Revoke a token by its access string; unknown tokens are not an error
    pub async fn revoke(&self, access: &str) -> Result<()> {
        with_deadline(self.settings.store_timeout, self.storage.remove_by_access(access)).await?;
        tracing::info!("Access token revoked");
        Ok(())
    }
}

fn token_response(info: &TokenInfo) -> TokenResponse {
    TokenResponse {
        access_token: info.access.clone(),
        token_type: constants::TOKEN_TYPE_BEARER.to_string(),
        expires_in: i64::try_from(info.access_expires_in.as_secs()).unwrap_or(i64::MAX),
        scope: Some(info.scope.clone()).filter(|s| !s.is_empty()),
    }
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate access token (using cryptographically secure RNG)
pub fn generate_access_token() -> String {
    random_token(ACCESS_TOKEN_BYTES)
}

/// Generate secure client secret (using cryptographically secure RNG)
pub fn generate_client_secret() -> String {
    random_token(CLIENT_SECRET_BYTES)
}
