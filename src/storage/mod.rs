//! Storage backends for oauthd
//!
//! Two capability traits back the authorization server: `ClientStore` (the
//! client directory) and `TokenStore` (issued access tokens). Every backend
//! implements both; `Storage` is the combined handle the server holds.

pub mod memory;
pub mod postgres;
pub mod sql_common;
pub mod sqlite;

use crate::error::StorageError;
use crate::{Result, model::*};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Client directory: resolves client identifiers to registered clients
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Resolve a client by its identifier
    ///
    /// An unregistered identifier is `Ok(None)`, never an error.
    async fn get_client(&self, id: &str) -> Result<Option<Client>>;

    /// Register or replace a client (administrative)
    async fn save_client(&self, client: &Client) -> Result<()>;

    /// List all registered clients (administrative)
    async fn list_clients(&self) -> Result<Vec<Client>>;

    /// Remove a client; returns whether a row was deleted (administrative)
    async fn delete_client(&self, id: &str) -> Result<bool>;
}

/// Token store: persists issued access tokens keyed by token string
///
/// `create`, `remove_by_access` and `get_by_access` are mandatory. Lookup and
/// removal by authorization code or refresh token are optional and fail with
/// `StorageError::Unsupported` unless a backend overrides them.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a freshly issued token
    ///
    /// Atomic per token; an existing token string yields `StorageError::Duplicate`.
    async fn create(&self, info: &TokenInfo) -> Result<()>;

    /// Delete a token by its access string; deleting an absent token is `Ok`
    async fn remove_by_access(&self, access: &str) -> Result<()>;

    /// Look up a token by its access string
    ///
    /// Expired rows are still returned; expiry is the caller's decision.
    async fn get_by_access(&self, access: &str) -> Result<Option<AccessToken>>;

    async fn get_by_code(&self, _code: &str) -> Result<Option<AccessToken>> {
        Err(unsupported("get_by_code"))
    }

    async fn remove_by_code(&self, _code: &str) -> Result<()> {
        Err(unsupported("remove_by_code"))
    }

    async fn get_by_refresh(&self, _refresh: &str) -> Result<Option<AccessToken>> {
        Err(unsupported("get_by_refresh"))
    }

    async fn remove_by_refresh(&self, _refresh: &str) -> Result<()> {
        Err(unsupported("remove_by_refresh"))
    }
}

fn unsupported(operation: &'static str) -> crate::OauthdError {
    tracing::error!(
        operation,
        "Unsupported token store operation invoked; authorization code and refresh token storage are not implemented"
    );
    crate::OauthdError::unsupported(operation)
}

/// Combined storage handle held by the authorization server
pub trait Storage: ClientStore + TokenStore {}

impl<T: ClientStore + TokenStore> Storage for T {}

/// Run a store operation under a deadline
///
/// On expiry the operation future is dropped (cancelling it) and the caller
/// receives `StorageError::Timeout`, a transient failure.
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Storage operation timed out");
            Err(StorageError::Timeout(timeout).into())
        }
    }
}

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;

/// Create a storage backend from configuration
pub async fn create_storage_from_config(
    config: &crate::config::StorageConfig,
) -> crate::Result<Arc<dyn Storage>> {
    let timeout = Duration::from_millis(config.timeout_ms);
    match config.driver.as_str() {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        "sqlite" => Ok(Arc::new(SqliteStorage::new(&config.dsn, timeout).await?)),
        "postgres" => Ok(Arc::new(PostgresStorage::new(&config.dsn, timeout).await?)),
        _ => Err(crate::OauthdError::config(format!(
            "Unknown storage driver: {}. Supported: memory, sqlite, postgres",
            config.driver
        ))),
    }
}
