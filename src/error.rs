//! Error types for oauthd
//!
//! This module provides the error hierarchy using thiserror.
//! All errors can be converted to OauthdError for unified error handling.
//!
//! Protocol outcomes (`OAuthError`) are recoverable and safe to show to the
//! caller. Storage outcomes (`StorageError`) carry internal detail and are only
//! ever logged.

use std::time::Duration;
use thiserror::Error;

/// Main error type for oauthd operations
#[derive(Error, Debug)]
pub enum OauthdError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// OAuth2 protocol outcomes (RFC 6749 §5.2 and RFC 6750 §3.1 error codes)
///
/// The `Display` text is the wire error code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    #[error("invalid_request")]
    InvalidRequest(String),

    /// Client credentials missing, malformed, unknown or wrong
    #[error("invalid_client")]
    InvalidClient,

    #[error("unsupported_grant_type")]
    UnsupportedGrantType(String),

    /// Requested scope was not granted to the client
    #[error("invalid_scope")]
    InvalidScope,

    /// Resource owner credentials rejected (password grant)
    #[error("access_denied")]
    AccessDenied,

    /// Bearer token absent from the token store
    #[error("invalid_token")]
    InvalidToken,

    /// Bearer token present but past its expiry
    #[error("expired_token")]
    ExpiredToken,
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}: {id}")]
    Duplicate { entity: String, id: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// Operation is declared by the token store contract but not implemented
    #[error("Unsupported storage operation: {0}")]
    Unsupported(&'static str),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether a caller may reasonably retry the operation
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Connection(_) | StorageError::Timeout(_))
    }
}

// Implement From for sqlx::Error
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connection(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StorageError::Duplicate {
                entity: db.table().unwrap_or("row").to_string(),
                id: db.message().to_string(),
            },
            _ => StorageError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for OauthdError {
    fn from(err: sqlx::Error) -> Self {
        OauthdError::Storage(StorageError::from(err))
    }
}

impl From<sqlx::migrate::MigrateError> for OauthdError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        OauthdError::storage(format!("Failed to run migrations: {}", err))
    }
}

/// Convenient result type for oauthd operations
pub type Result<T> = std::result::Result<T, OauthdError>;

impl OauthdError {
    /// Create a validation error
    #[inline]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        OauthdError::Validation(msg.into())
    }

    /// Create a config error
    #[inline]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        OauthdError::Config(msg.into())
    }

    /// Create a storage error
    #[inline]
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        OauthdError::Storage(StorageError::Database(msg.into()))
    }

    /// Create a not found error
    #[inline]
    pub fn not_found(entity: &str, id: &str) -> Self {
        OauthdError::Storage(StorageError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        })
    }

    /// Create an unsupported-operation error
    #[inline]
    pub fn unsupported(operation: &'static str) -> Self {
        OauthdError::Storage(StorageError::Unsupported(operation))
    }

    /// The protocol outcome, if this error is one
    pub fn as_oauth(&self) -> Option<&OAuthError> {
        match self {
            OauthdError::OAuth(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure is a storage outage the caller may retry
    pub fn is_transient(&self) -> bool {
        matches!(self, OauthdError::Storage(e) if e.is_transient())
    }

    /// Whether the failure is a misuse of the token store contract
    pub fn is_unsupported(&self) -> bool {
        matches!(self, OauthdError::Storage(StorageError::Unsupported(_)))
    }

    /// Text safe to return to a caller
    ///
    /// Protocol outcomes are echoed verbatim; anything else collapses to
    /// `server_error` so internal detail never leaves the process.
    pub fn public_message(&self) -> String {
        match self {
            OauthdError::OAuth(e) => e.to_string(),
            _ => "server_error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_codes() {
        assert_eq!(OAuthError::InvalidClient.to_string(), "invalid_client");
        assert_eq!(OAuthError::InvalidScope.to_string(), "invalid_scope");
        assert_eq!(OAuthError::InvalidToken.to_string(), "invalid_token");
        assert_eq!(OAuthError::ExpiredToken.to_string(), "expired_token");
        assert_eq!(
            OAuthError::InvalidRequest("grant_type".into()).to_string(),
            "invalid_request"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(StorageError::Connection("refused".into()).is_transient());
        assert!(!StorageError::Unsupported("get_by_code").is_transient());
        assert!(
            !StorageError::NotFound {
                entity: "client".into(),
                id: "x".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = OauthdError::storage("connection string postgres://secret@db");
        assert_eq!(err.public_message(), "server_error");

        let err = OauthdError::unsupported("get_by_refresh");
        assert!(err.is_unsupported());
        assert_eq!(err.public_message(), "server_error");

        let err: OauthdError = OAuthError::ExpiredToken.into();
        assert_eq!(err.public_message(), "expired_token");
    }
}
