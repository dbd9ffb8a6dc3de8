//! Scope authorization hook
//!
//! Runs during token generation for the password and client credentials
//! grants, never during bearer validation.

use crate::model::{Client, TokenGenerateRequest, split_scope};
use std::collections::HashSet;

/// Decides whether a token request may receive its requested scope
///
/// Implementations may rewrite `request.scope` or set
/// `request.access_token_exp` before issuance.
pub trait ScopeAuthorizer: Send + Sync {
    fn authorize(&self, client: &Client, request: &mut TokenGenerateRequest) -> bool;
}

impl<F> ScopeAuthorizer for F
where
    F: Fn(&Client, &mut TokenGenerateRequest) -> bool + Send + Sync,
{
    fn authorize(&self, client: &Client, request: &mut TokenGenerateRequest) -> bool {
        self(client, request)
    }
}

/// Placeholder policy: every requested scope is allowed
///
/// Production deployments should install `GrantedScopeAuthorizer` or their own policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllScopes;

impl ScopeAuthorizer for AllowAllScopes {
    fn authorize(&self, client: &Client, request: &mut TokenGenerateRequest) -> bool {
        tracing::debug!(
            client_id = %client.id,
            scope = %request.scope,
            "Scope allowed (allow-all policy)"
        );
        true
    }
}

/// Requested scope must be a token-wise subset of the client's granted scope
///
/// An empty request receives the client's full granted scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantedScopeAuthorizer;

impl ScopeAuthorizer for GrantedScopeAuthorizer {
    fn authorize(&self, client: &Client, request: &mut TokenGenerateRequest) -> bool {
        let requested = split_scope(&request.scope);
        if requested.is_empty() {
            request.scope = client.scopes().join(" ");
            return true;
        }

        let granted: HashSet<&str> = client.scopes().into_iter().collect();
        let denied: Vec<&str> = requested
            .into_iter()
            .filter(|s| !granted.contains(s))
            .collect();

        if denied.is_empty() {
            true
        } else {
            tracing::info!(
                client_id = %client.id,
                denied = %denied.join(" "),
                "Requested scope not granted to client"
            );
            false
        }
    }
}
