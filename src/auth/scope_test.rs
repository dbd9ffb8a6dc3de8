use super::scope::*;
use crate::model::{Client, GrantType, TokenGenerateRequest};
use std::time::Duration;

fn client() -> Client {
    Client::new("000000", "999999", "http://localhost", "read write")
}

fn request(scope: &str) -> TokenGenerateRequest {
    TokenGenerateRequest::new(GrantType::ClientCredentials, "000000", "999999", scope)
}

#[test]
fn test_allow_all_allows_anything() {
    let mut req = request("admin everything");
    assert!(AllowAllScopes.authorize(&client(), &mut req));
    assert_eq!(req.scope, "admin everything");
}

#[test]
fn test_granted_scope_subset_allowed() {
    let mut req = request("read");
    assert!(GrantedScopeAuthorizer.authorize(&client(), &mut req));
    assert_eq!(req.scope, "read");

    let mut req = request("write  read");
    assert!(GrantedScopeAuthorizer.authorize(&client(), &mut req));
}

#[test]
fn test_granted_scope_rejects_extra_token() {
    let mut req = request("read delete");
    assert!(!GrantedScopeAuthorizer.authorize(&client(), &mut req));

    // Token-wise, not substring
    let mut req = request("rea");
    assert!(!GrantedScopeAuthorizer.authorize(&client(), &mut req));
}

#[test]
fn test_granted_scope_fills_empty_request() {
    let mut req = request("");
    assert!(GrantedScopeAuthorizer.authorize(&client(), &mut req));
    assert_eq!(req.scope, "read write");
}

#[test]
fn test_closure_policy_can_rewrite_request() {
    let policy = |_client: &Client, req: &mut TokenGenerateRequest| {
        req.scope = "read".to_string();
        req.access_token_exp = Some(Duration::from_secs(60));
        true
    };

    let mut req = request("anything");
    assert!(policy.authorize(&client(), &mut req));
    assert_eq!(req.scope, "read");
    assert_eq!(req.access_token_exp, Some(Duration::from_secs(60)));
}
