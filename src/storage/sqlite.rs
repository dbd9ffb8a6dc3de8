//! SQLite storage implementation
//!
//! Provides persistent storage for clients and access tokens using SQLite.

use crate::model::*;
use crate::storage::{ClientStore, TokenStore, sql_common::*};
use crate::{OauthdError, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::{Component, Path};
use std::str::FromStr;
use std::time::Duration;

/// SQLite storage backend
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage
    ///
    /// # Arguments
    /// * `dsn` - Database path (e.g., "~/.oauthd/oauthd.db" or ":memory:" for in-memory)
    /// * `timeout` - Deadline for acquiring a pooled connection
    pub async fn new(dsn: &str, timeout: Duration) -> Result<Self> {
        // Prepend sqlite: prefix if not present and add create-if-missing option
        let connection_string = if dsn.starts_with("sqlite:") {
            if dsn.contains('?') {
                dsn.to_string()
            } else {
                format!("{}?mode=rwc", dsn)
            }
        } else {
            format!("sqlite:{}?mode=rwc", dsn)
        };

        // Extract actual file path for directory creation
        let file_path = dsn.strip_prefix("sqlite:").unwrap_or(dsn);
        let in_memory = file_path.starts_with(":memory:");

        // Validate path to prevent directory traversal attacks
        if Path::new(file_path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(OauthdError::config(
                "Database path cannot contain '..' (path traversal not allowed)",
            ));
        }

        if !in_memory
            && let Some(parent) = Path::new(file_path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| OauthdError::config(format!("Invalid SQLite DSN: {}", e)))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool_options = SqlitePoolOptions::new().acquire_timeout(timeout);

        // An in-memory database lives only as long as its connection; keep exactly one open
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(10)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| OauthdError::storage(format!("Failed to connect to SQLite: {}", e)))?;

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .map_err(|e| OauthdError::storage(format!("Failed to run migrations: {}", e)))?;

        tracing::debug!(dsn = %file_path, "SQLite storage ready");

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn parse_client(row: &SqliteRow) -> Result<Client> {
        Ok(Client {
            id: row.try_get("client_id")?,
            secret: row.try_get("secret")?,
            domain: row.try_get("domain")?,
            scope: row.try_get("scope")?,
            created_at: datetime_from_unix(row.try_get("created_at")?),
            updated_at: datetime_from_unix(row.try_get("updated_at")?),
        })
    }
}

#[async_trait]
impl ClientStore for SqliteStorage {
    async fn get_client(&self, id: &str) -> Result<Option<Client>> {
        let row = sqlx::query(
            "SELECT client_id, secret, domain, scope, created_at, updated_at
             FROM clients
             WHERE client_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_client).transpose()
    }

    async fn save_client(&self, client: &Client) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO clients (client_id, secret, domain, scope, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(client_id) DO UPDATE SET
                secret = excluded.secret,
                domain = excluded.domain,
                scope = excluded.scope,
                updated_at = excluded.updated_at",
        )
        .bind(&client.id)
        .bind(&client.secret)
        .bind(&client.domain)
        .bind(&client.scope)
        .bind(datetime_to_unix(client.created_at))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query(
            "SELECT client_id, secret, domain, scope, created_at, updated_at
             FROM clients
             ORDER BY client_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_client).collect()
    }

    async fn delete_client(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TokenStore for SqliteStorage {
    async fn create(&self, info: &TokenInfo) -> Result<()> {
        let data = encode_token_data(info)?;
        let now = Utc::now().timestamp();

        // Plain INSERT: the UNIQUE(token) constraint rejects duplicates atomically
        sqlx::query(
            "INSERT INTO access_tokens (token, client_id, expired_at, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&info.access)
        .bind(&info.client_id)
        .bind(info.expires_at().timestamp())
        .bind(data)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_token_insert_error(e, &info.client_id))?;

        Ok(())
    }

    async fn remove_by_access(&self, access: &str) -> Result<()> {
        sqlx::query("DELETE FROM access_tokens WHERE token = ?")
            .bind(access)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_access(&self, access: &str) -> Result<Option<AccessToken>> {
        if access.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT token, client_id, expired_at, data
             FROM access_tokens
             WHERE token = ?",
        )
        .bind(access)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(access_token_from_columns(
                    row.try_get("token")?,
                    row.try_get("client_id")?,
                    row.try_get("expired_at")?,
                    &data,
                )?))
            }
            None => Ok(None),
        }
    }
}
