//! oauthd - OAuth2 authorization server core
//!
//! This library issues, validates and revokes bearer access tokens on behalf
//! of registered clients. It can be:
//! - Embedded as a library (build an `AuthorizationServer` over any `Storage`)
//! - Run as an HTTP server (`oauthd serve`)
//! - Administered from the command line (`oauthd client register|list|delete`)
//!
//! # Architecture
//!
//! - Client directory and token store behind async traits, with in-memory,
//!   SQLite and PostgreSQL backends
//! - Client authentication trying HTTP Basic first, then form parameters
//! - Pluggable scope authorization (allow-all by default)
//! - Explicit expiry checks on validation; expired rows are never purged
//!
//! # Example
//!
//! ```rust,no_run
//! use oauthd::auth::{AuthorizationServer, TokenRequest};
//! use oauthd::config::ServerSettings;
//! use oauthd::model::Client;
//! use oauthd::storage::{ClientStore, MemoryStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Arc::new(MemoryStorage::new());
//!     storage
//!         .save_client(&Client::new("000000", "999999", "http://localhost", "read"))
//!         .await?;
//!
//!     let server = AuthorizationServer::new(ServerSettings::default(), storage);
//!     let request = TokenRequest::default()
//!         .with_basic_auth("000000", "999999")
//!         .with_param("grant_type", "client_credentials");
//!
//!     let token = server.handle_token_request(&request).await?;
//!     let descriptor = server.validate_bearer(&token.access_token).await?;
//!     println!("{} expires in {}s", descriptor.client_id, descriptor.expires_in_secs());
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod constants;
pub mod error;
pub mod model;

// Infrastructure
pub mod config;
pub mod storage;
pub mod telemetry;

// Authorization server and its interfaces
pub mod auth;
pub mod cli;
pub mod http;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use auth::AuthorizationServer;
pub use error::{OAuthError, OauthdError, Result};
pub use model::{AccessToken, Client, TokenDescriptor, TokenInfo};

/// Initialize logging for the application
///
/// `RUST_LOG` wins when set; otherwise `level` (from config) applies to the
/// `oauthd` target, defaulting to `info`. Calling it twice is harmless.
pub fn init_logging(level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = format!("oauthd={},tower_http=info", level.unwrap_or("info"));

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
