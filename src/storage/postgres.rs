//! PostgreSQL storage backend
//!
//! Provides a production-ready PostgreSQL implementation of the client and
//! token stores.

use super::{ClientStore, TokenStore, sql_common::*};
use crate::{OauthdError, Result, model::*};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

/// PostgreSQL storage implementation
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Create a new PostgreSQL storage from a connection string
    pub async fn new(database_url: &str, timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(timeout)
            .connect(database_url)
            .await
            .map_err(|e| {
                OauthdError::storage(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        // Run PostgreSQL-specific migrations
        sqlx::migrate!("./migrations/postgres")
            .run(&pool)
            .await
            .map_err(|e| OauthdError::storage(format!("Failed to run migrations: {}", e)))?;

        Ok(Self { pool })
    }

    fn parse_client(row: &PgRow) -> Result<Client> {
        Ok(Client {
            id: row.try_get("client_id")?,
            secret: row.try_get("secret")?,
            domain: row.try_get("domain")?,
            scope: row.try_get("scope")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ClientStore for PostgresStorage {
    async fn get_client(&self, id: &str) -> Result<Option<Client>> {
        let row = sqlx::query(
            "SELECT client_id, secret, domain, scope, created_at, updated_at
             FROM clients
             WHERE client_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_client).transpose()
    }

    async fn save_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            "INSERT INTO clients (client_id, secret, domain, scope, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT(client_id) DO UPDATE SET
                secret = EXCLUDED.secret,
                domain = EXCLUDED.domain,
                scope = EXCLUDED.scope,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&client.id)
        .bind(&client.secret)
        .bind(&client.domain)
        .bind(&client.scope)
        .bind(client.created_at)
        .bind(Utc::now())
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
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TokenStore for PostgresStorage {
    async fn create(&self, info: &TokenInfo) -> Result<()> {
        let data = encode_token_data(info)?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO access_tokens (token, client_id, expired_at, data, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
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
        sqlx::query("DELETE FROM access_tokens WHERE token = $1")
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
             WHERE token = $1",
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
