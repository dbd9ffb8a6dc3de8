//! Configuration management for oauthd
//!
//! Loads configuration from oauthd.config.json (or YAML), validates it, and
//! derives the read-only `ServerSettings` handed to the authorization server.

use crate::constants;
use crate::{OauthdError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Complete oauthd configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Storage configuration (required)
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfig>,

    /// OAuth token configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,

    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Driver name (sqlite, postgres, memory)
    pub driver: String,

    /// Data source name / connection string
    #[serde(default)]
    pub dsn: String,

    /// Deadline for a single storage operation, in milliseconds
    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

/// OAuth token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig {
    /// Access token lifetime in seconds
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

fn default_host() -> String {
    constants::DEFAULT_HTTP_HOST.to_string()
}

fn default_port() -> u16 {
    constants::DEFAULT_HTTP_PORT
}

fn default_storage_timeout_ms() -> u64 {
    constants::DEFAULT_STORAGE_TIMEOUT_MS
}

fn default_token_lifetime_secs() -> u64 {
    constants::DEFAULT_TOKEN_LIFETIME_SECS
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            token_lifetime_secs: default_token_lifetime_secs(),
        }
    }
}

/// Settings the authorization server reads on every request
///
/// Built once at startup from `Config`; never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Lifetime of every issued access token
    pub token_lifetime: Duration,

    /// Deadline applied to each storage call
    pub store_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(constants::DEFAULT_TOKEN_LIFETIME_SECS),
            store_timeout: Duration::from_millis(constants::DEFAULT_STORAGE_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// `OAUTHD_CONFIG` overrides the path when set.
    pub fn load() -> Result<Self> {
        let path = env::var(constants::ENV_CONFIG_PATH)
            .unwrap_or_else(|_| constants::CONFIG_FILE_NAME.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from specific path
    ///
    /// Supports both JSON and YAML formats based on file extension:
    /// - `.json` files are parsed as JSON
    /// - `.yaml` or `.yml` files are parsed as YAML
    /// - Files without extension default to JSON parsing
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // Return default config if file doesn't exist
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;

        let mut config: Config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
                OauthdError::config(format!("Failed to parse YAML config: {}", e))
            })?,
            _ => serde_json::from_str(&content).map_err(|e| {
                OauthdError::config(format!("Failed to parse JSON config: {}", e))
            })?,
        };

        config.storage.dsn = expand_env_value(&config.storage.dsn);
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to specific path (JSON or YAML by extension)
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = match path_ref.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::to_string(self).map_err(|e| {
                OauthdError::config(format!("Failed to serialize to YAML: {}", e))
            })?,
            _ => serde_json::to_string_pretty(self)?,
        };

        std::fs::write(path_ref, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.driver.is_empty() {
            return Err(OauthdError::config("storage.driver is required"));
        }

        match self.storage.driver.as_str() {
            "memory" => {}
            "sqlite" | "postgres" => {
                if self.storage.dsn.is_empty() {
                    return Err(OauthdError::config(format!(
                        "storage.dsn is required for the {} driver",
                        self.storage.driver
                    )));
                }
            }
            _ => {
                return Err(OauthdError::config(format!(
                    "Unsupported storage driver: '{}'. Supported: sqlite, postgres, memory",
                    self.storage.driver
                )));
            }
        }

        if self.storage.timeout_ms == 0 {
            return Err(OauthdError::config(
                "storage.timeoutMs must be greater than 0",
            ));
        }

        if let Some(ref oauth) = self.oauth
            && i64::try_from(oauth.token_lifetime_secs).is_err()
        {
            return Err(OauthdError::config(format!(
                "oauth.tokenLifetimeSecs must be at most {}",
                i64::MAX
            )));
        }

        if let Some(ref http) = self.http {
            if http.port == 0 {
                return Err(OauthdError::config("http.port must be nonzero (1-65535)"));
            }

            if http.host.is_empty() {
                return Err(OauthdError::config("http.host cannot be empty"));
            }
        }

        Ok(())
    }

    /// HTTP config with defaults applied
    pub fn http_config(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }

    /// Derive the read-only authorization server settings
    pub fn server_settings(&self) -> ServerSettings {
        let oauth = self.oauth.clone().unwrap_or_default();
        ServerSettings {
            token_lifetime: Duration::from_secs(oauth.token_lifetime_secs),
            store_timeout: Duration::from_millis(self.storage.timeout_ms),
        }
    }

    /// Configured log filter, if any
    pub fn log_level(&self) -> Option<&str> {
        self.log.as_ref().and_then(|l| l.level.as_deref())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                driver: "sqlite".to_string(),
                dsn: constants::default_sqlite_dsn().to_string(),
                timeout_ms: default_storage_timeout_ms(),
            },
            http: Some(HttpConfig::default()),
            oauth: Some(OAuthConfig::default()),
            log: Some(LogConfig {
                level: Some("info".to_string()),
            }),
        }
    }
}

/// Expand a `$env:NAME` reference; any other value is returned unchanged
///
/// An unset variable expands to the empty string so validation can reject it.
pub fn expand_env_value(value: &str) -> String {
    match value.strip_prefix(constants::ENV_VALUE_PREFIX) {
        Some(var) => env::var(var).unwrap_or_default(),
        None => value.to_string(),
    }
}
