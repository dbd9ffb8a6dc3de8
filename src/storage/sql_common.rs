//! Common SQL storage helpers for SQLite and PostgreSQL
//!
//! Shared conversions between model types and the two-table schema
//! (`clients`, `access_tokens`) used by both SQL backends.

use crate::error::StorageError;
use crate::{OauthdError, Result, model::*};
use chrono::{DateTime, Utc};

/// Entity name reported in duplicate-token errors
pub const ACCESS_TOKEN_ENTITY: &str = "access token";

// ============================================================================
// Token data (the serialized `data` column)
// ============================================================================

/// Serialize the token generation context for the `data` column
#[inline]
pub fn encode_token_data(info: &TokenInfo) -> Result<String> {
    Ok(serde_json::to_string(info)?)
}

/// Deserialize the `data` column back into the token generation context
#[inline]
pub fn decode_token_data(text: &str) -> Result<TokenInfo> {
    serde_json::from_str(text).map_err(|e| OauthdError::Storage(StorageError::JsonError(e)))
}

/// Rebuild an access token row from its stored columns
///
/// `data` is authoritative; the index columns are kept as stored.
pub fn access_token_from_columns(
    token: String,
    client_id: String,
    expired_at: i64,
    data: &str,
) -> Result<AccessToken> {
    Ok(AccessToken {
        token,
        client_id,
        expired_at,
        data: decode_token_data(data)?,
    })
}

/// Map an insert failure on `access_tokens`
///
/// A unique violation on the token column becomes `StorageError::Duplicate`.
pub fn map_token_insert_error(err: sqlx::Error, client_id: &str) -> OauthdError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            OauthdError::Storage(StorageError::Duplicate {
                entity: ACCESS_TOKEN_ENTITY.to_string(),
                id: client_id.to_string(),
            })
        }
        other => OauthdError::Storage(StorageError::from(other)),
    }
}

// ============================================================================
// SQLite-specific Helpers
// ============================================================================

/// Convert DateTime to SQLite INTEGER (unix timestamp)
#[inline]
pub fn datetime_to_unix(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Parse DateTime from SQLite INTEGER (unix timestamp)
#[inline]
pub fn datetime_from_unix(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
