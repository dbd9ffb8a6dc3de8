//! OAuth2 authorization server core
//!
//! - **Credentials**: client credential extraction (Basic header, then form)
//! - **Scope**: pluggable scope authorization hook
//! - **Server**: token issuance, bearer validation and revocation
//! - **Bearer**: bearer token extraction and the axum extractor for protected routes

pub mod bearer;
pub mod credentials;
pub mod scope;
pub mod server;

pub use bearer::{AuthenticatedClient, extract_bearer_token};
pub use credentials::{
    BasicAuthExtractor, ChainExtractor, ClientCredentials, ClientCredentialsExtractor,
    CredentialError, FormExtractor, TokenRequest,
};
pub use scope::{AllowAllScopes, GrantedScopeAuthorizer, ScopeAuthorizer};
pub use server::{
    AuthorizationServer, DenyAllUsers, PasswordAuthenticator, generate_access_token,
    generate_client_secret,
};

#[cfg(test)]
mod scope_test;
