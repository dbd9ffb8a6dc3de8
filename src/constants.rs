//! Constants used throughout oauthd
//!
//! Configuration paths, protocol defaults, and environment variable names.

use once_cell::sync::Lazy;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Get the home directory with fallback to current directory
pub fn get_home_dir() -> &'static str {
    static HOME_DIR: Lazy<String> = Lazy::new(|| {
        dirs::home_dir()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string())
    });
    &HOME_DIR
}

/// Default data directory (~/.oauthd)
pub fn default_data_dir() -> &'static str {
    static DATA_DIR: Lazy<String> = Lazy::new(|| format!("{}/.oauthd", get_home_dir()));
    &DATA_DIR
}

/// Default SQLite DSN (~/.oauthd/oauthd.db)
pub fn default_sqlite_dsn() -> &'static str {
    static SQLITE_DSN: Lazy<String> = Lazy::new(|| format!("{}/oauthd.db", default_data_dir()));
    &SQLITE_DSN
}

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "oauthd.config.json";

/// Environment variable overriding the config file path
pub const ENV_CONFIG_PATH: &str = "OAUTHD_CONFIG";

/// Prefix marking a config value as an environment variable reference
pub const ENV_VALUE_PREFIX: &str = "$env:";

// ============================================================================
// HTTP
// ============================================================================

/// Default HTTP host
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

// ============================================================================
// OAUTH
// ============================================================================

/// Default access token lifetime (2 hours)
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 2 * 60 * 60;

/// Default deadline for a single storage operation
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;

/// Random bytes in a generated access token (256 bits)
pub const ACCESS_TOKEN_BYTES: usize = 32;

/// Random bytes in a generated client secret
pub const CLIENT_SECRET_BYTES: usize = 32;

/// Token type reported by the token endpoint
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// ============================================================================
// REQUEST PARAMETERS
// ============================================================================

pub const PARAM_GRANT_TYPE: &str = "grant_type";
pub const PARAM_CLIENT_ID: &str = "client_id";
pub const PARAM_CLIENT_SECRET: &str = "client_secret";
pub const PARAM_SCOPE: &str = "scope";
pub const PARAM_USERNAME: &str = "username";
pub const PARAM_PASSWORD: &str = "password";
pub const PARAM_CODE: &str = "code";
pub const PARAM_REFRESH_TOKEN: &str = "refresh_token";
pub const PARAM_ACCESS_TOKEN: &str = "access_token";
pub const PARAM_TOKEN: &str = "token";
