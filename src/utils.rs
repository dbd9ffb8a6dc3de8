//! Utility functions and helpers
//!
//! Shared test scaffolding used by unit and integration tests.

use crate::auth::AuthorizationServer;
use crate::config::{Config, ServerSettings, StorageConfig};
use crate::model::Client;
use crate::storage::{ClientStore, SqliteStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Test environment with an isolated temporary data directory
///
/// Mirrors production storage: a file-backed SQLite database under a
/// temporary `.oauthd/` directory, removed when the environment drops.
///
/// # Example
///
/// ```no_run
/// use oauthd::utils::TestEnvironment;
///
/// # async fn example() {
/// let env = TestEnvironment::new().await;
/// env.register_client("000000", "999999", "read").await;
/// let server = env.server(Default::default());
/// # }
/// ```
pub struct TestEnvironment {
    /// Kept alive for the test duration
    _temp_dir: TempDir,

    /// Path of the SQLite database file
    pub db_path: PathBuf,

    /// Storage shared by every server built from this environment
    pub storage: Arc<dyn Storage>,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub async fn new() -> Self {
        Self::with_db_name("oauthd.db").await
    }

    /// Create a test environment with a custom database name
    pub async fn with_db_name(db_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join(".oauthd").join(db_name);

        // Parent directory is created by SqliteStorage
        let storage = SqliteStorage::new(
            db_path.to_str().expect("temp path is not UTF-8"),
            Duration::from_millis(crate::constants::DEFAULT_STORAGE_TIMEOUT_MS),
        )
        .await
        .expect("Failed to create SQLite storage");

        TestEnvironment {
            _temp_dir: temp_dir,
            db_path,
            storage: Arc::new(storage),
        }
    }

    /// Config pointing at this environment's database
    pub fn config(&self) -> Config {
        Config {
            storage: StorageConfig {
                driver: "sqlite".to_string(),
                dsn: self.db_path.to_string_lossy().to_string(),
                timeout_ms: crate::constants::DEFAULT_STORAGE_TIMEOUT_MS,
            },
            ..Default::default()
        }
    }

    /// Register a client directly in storage
    pub async fn register_client(&self, id: &str, secret: &str, scope: &str) -> Client {
        let client = Client::new(id, secret, "http://localhost", scope);
        self.storage
            .save_client(&client)
            .await
            .expect("Failed to save client");
        client
    }

    /// Authorization server over this environment's storage
    pub fn server(&self, settings: ServerSettings) -> Arc<AuthorizationServer> {
        Arc::new(AuthorizationServer::new(settings, self.storage.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_environment_creates_structure() {
        let env = TestEnvironment::new().await;
        assert!(env.db_path.exists());

        env.register_client("000000", "999999", "read").await;
        let client = env
            .storage
            .get_client("000000")
            .await
            .expect("Should be able to read from database");
        assert_eq!(client.map(|c| c.secret), Some("999999".to_string()));
    }

    #[tokio::test]
    async fn test_config_points_at_environment() {
        let env = TestEnvironment::new().await;
        let config = env.config();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.dsn, env.db_path.to_string_lossy());
    }
}
