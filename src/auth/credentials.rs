//! Client credential extraction
//!
//! Extraction only: the pair returned here is verified against the client
//! directory by the authorization server, never by the extractors.

use crate::constants::{PARAM_CLIENT_ID, PARAM_CLIENT_SECRET};
use axum::http::{HeaderMap, HeaderValue, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Routing-neutral view of an inbound token endpoint request
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    pub headers: HeaderMap,
    /// Query and form parameters, form values taking precedence
    pub params: HashMap<String, String>,
}

impl TokenRequest {
    pub fn new(headers: HeaderMap, params: HashMap<String, String>) -> Self {
        Self { headers, params }
    }

    /// Merge query and form parameters; a form value wins over the same query key
    pub fn from_parts(
        headers: HeaderMap,
        query: HashMap<String, String>,
        form: HashMap<String, String>,
    ) -> Self {
        let mut params = query;
        params.extend(form);
        Self { headers, params }
    }

    /// Non-empty parameter value
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Attach an `Authorization: Basic` header for the given pair
    pub fn with_basic_auth(mut self, client_id: &str, client_secret: &str) -> Self {
        let encoded = STANDARD.encode(format!(
            "{}:{}",
            urlencoding::encode(client_id),
            urlencoding::encode(client_secret)
        ));
        if let Ok(value) = HeaderValue::from_str(&format!("Basic {}", encoded)) {
            self.headers.insert(header::AUTHORIZATION, value);
        }
        self
    }
}

/// Client identifier and secret as presented by the caller
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Why a strategy could not produce credentials
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not Basic")]
    NotBasic,

    #[error("malformed Basic credentials: {0}")]
    MalformedBasic(&'static str),

    #[error("missing parameter: {0}")]
    MissingField(&'static str),

    #[error("no credential extractors configured")]
    NoExtractors,
}

/// One credential-transmission scheme
pub trait ClientCredentialsExtractor: Send + Sync {
    /// Scheme name used in logs
    fn name(&self) -> &'static str;

    fn extract(&self, request: &TokenRequest) -> Result<ClientCredentials, CredentialError>;
}

/// `Authorization: Basic base64(urlencode(id):urlencode(secret))` (RFC 6749 §2.3.1)
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuthExtractor;

impl ClientCredentialsExtractor for BasicAuthExtractor {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn extract(&self, request: &TokenRequest) -> Result<ClientCredentials, CredentialError> {
        let value = request
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(CredentialError::MissingHeader)?
            .to_str()
            .map_err(|_| CredentialError::MalformedBasic("header is not visible ASCII"))?;

        let (scheme, encoded) = value
            .trim()
            .split_once(' ')
            .ok_or(CredentialError::NotBasic)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(CredentialError::NotBasic);
        }

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CredentialError::MalformedBasic("invalid base64"))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| CredentialError::MalformedBasic("invalid UTF-8"))?;

        // Secrets may contain ':'; only the first one separates
        let (raw_id, raw_secret) = decoded
            .split_once(':')
            .ok_or(CredentialError::MalformedBasic("missing ':' separator"))?;

        let client_id = urlencoding::decode(raw_id)
            .map_err(|_| CredentialError::MalformedBasic("invalid percent-encoding"))?
            .into_owned();
        let client_secret = urlencoding::decode(raw_secret)
            .map_err(|_| CredentialError::MalformedBasic("invalid percent-encoding"))?
            .into_owned();

        if client_id.is_empty() || client_secret.is_empty() {
            return Err(CredentialError::MalformedBasic("empty client id or secret"));
        }

        Ok(ClientCredentials {
            client_id,
            client_secret,
        })
    }
}

/// `client_id` / `client_secret` request parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct FormExtractor;

impl ClientCredentialsExtractor for FormExtractor {
    fn name(&self) -> &'static str {
        "form"
    }

    fn extract(&self, request: &TokenRequest) -> Result<ClientCredentials, CredentialError> {
        let client_id = request
            .param(PARAM_CLIENT_ID)
            .ok_or(CredentialError::MissingField(PARAM_CLIENT_ID))?;
        let client_secret = request
            .param(PARAM_CLIENT_SECRET)
            .ok_or(CredentialError::MissingField(PARAM_CLIENT_SECRET))?;

        Ok(ClientCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }
}

/// Tries each extractor in order; the first success wins
///
/// When all fail, the last extractor's error is returned.
#[derive(Clone)]
pub struct ChainExtractor {
    extractors: Vec<Arc<dyn ClientCredentialsExtractor>>,
}

impl ChainExtractor {
    pub fn new(extractors: Vec<Arc<dyn ClientCredentialsExtractor>>) -> Self {
        Self { extractors }
    }
}

impl Default for ChainExtractor {
    fn default() -> Self {
        Self::new(vec![Arc::new(BasicAuthExtractor), Arc::new(FormExtractor)])
    }
}

impl ClientCredentialsExtractor for ChainExtractor {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn extract(&self, request: &TokenRequest) -> Result<ClientCredentials, CredentialError> {
        let mut last_error = CredentialError::NoExtractors;
        for extractor in &self.extractors {
            match extractor.extract(request) {
                Ok(credentials) => {
                    tracing::debug!(
                        scheme = extractor.name(),
                        client_id = %credentials.client_id,
                        "Client credentials extracted"
                    );
                    return Ok(credentials);
                }
                Err(e) => {
                    tracing::trace!(scheme = extractor.name(), error = %e, "Credential scheme did not apply");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
