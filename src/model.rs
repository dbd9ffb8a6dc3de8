//! Core data models for oauthd
//!
//! Registered clients, persisted access tokens, and the transient views the
//! authorization server builds from them.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Registered OAuth client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    /// Externally assigned client identifier (unique)
    pub id: String,

    /// Shared secret
    pub secret: String,

    /// Registered origin / redirect domain (informational)
    pub domain: String,

    /// Space-delimited granted scope
    pub scope: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Build a client record stamped with the current time
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        domain: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            secret: secret.into(),
            domain: domain.into(),
            scope: scope.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Granted scope split into its tokens
    pub fn scopes(&self) -> Vec<&str> {
        split_scope(&self.scope)
    }

    /// Validate the client record before registration
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.trim().is_empty() {
            return Err(crate::OauthdError::validation("client id is required"));
        }
        if self.secret.is_empty() {
            return Err(crate::OauthdError::validation("client secret is required"));
        }
        Ok(())
    }
}

/// Split a space-delimited scope string into tokens
pub fn split_scope(scope: &str) -> Vec<&str> {
    scope.split_whitespace().collect()
}

/// Token generation context, serialized whole into `AccessToken::data`
///
/// This is the authoritative record of an issued token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    /// Owning client
    pub client_id: String,

    /// Resource owner (empty for client credentials)
    #[serde(default)]
    pub user_id: String,

    /// Redirect URI used (empty for the implemented grants)
    #[serde(default)]
    pub redirect_uri: String,

    /// Granted scope
    #[serde(default)]
    pub scope: String,

    /// Access token string
    pub access: String,

    /// Access token creation time
    pub access_create_at: DateTime<Utc>,

    /// Access token lifetime
    #[serde(with = "duration_secs")]
    pub access_expires_in: Duration,
}

impl TokenInfo {
    /// Absolute expiry instant
    pub fn expires_at(&self) -> DateTime<Utc> {
        ChronoDuration::from_std(self.access_expires_in)
            .ok()
            .and_then(|d| self.access_create_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Persisted access token row
///
/// `token`, `client_id` and `expired_at` are index columns derived from `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    /// Bearer credential (unique)
    pub token: String,

    /// Owning client id
    pub client_id: String,

    /// Absolute expiry, unix seconds
    pub expired_at: i64,

    /// Full token generation context
    pub data: TokenInfo,
}

impl AccessToken {
    /// Derive the row from a token generation context
    pub fn from_info(info: TokenInfo) -> Self {
        Self {
            token: info.access.clone(),
            client_id: info.client_id.clone(),
            expired_at: info.expires_at().timestamp(),
            data: info,
        }
    }

    /// Expiry as a timestamp
    pub fn expired_at_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expired_at, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Validated view of a presented bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDescriptor {
    pub access_token: String,
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub expires_in: Duration,
    /// Time left until expiry; always positive
    pub remaining_lifetime: ChronoDuration,
}

impl TokenDescriptor {
    /// Whole seconds until expiry
    pub fn expires_in_secs(&self) -> i64 {
        self.remaining_lifetime.num_seconds()
    }

    pub fn scopes(&self) -> Vec<&str> {
        split_scope(&self.scope)
    }
}

/// OAuth2 grant types understood by the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    Password,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = crate::OAuthError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(GrantType::AuthorizationCode),
            "password" => Ok(GrantType::Password),
            "client_credentials" => Ok(GrantType::ClientCredentials),
            "refresh_token" => Ok(GrantType::RefreshToken),
            other => Err(crate::OAuthError::UnsupportedGrantType(other.to_string())),
        }
    }
}

/// Token generation request handed to the scope hook and the issuer
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGenerateRequest {
    pub grant_type: GrantType,
    pub client_id: String,
    pub client_secret: String,
    pub user_id: String,
    pub redirect_uri: String,
    /// Requested scope; the scope hook may rewrite it
    pub scope: String,
    /// Lifetime override set by the scope hook
    pub access_token_exp: Option<Duration>,
}

impl TokenGenerateRequest {
    pub fn new(
        grant_type: GrantType,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            grant_type,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_id: String::new(),
            redirect_uri: String::new(),
            scope: scope.into(),
            access_token_exp: None,
        }
    }
}

/// Successful token endpoint response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
