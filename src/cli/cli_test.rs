use super::*;
use crate::storage::MemoryStorage;

fn memory_storage() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new())
}

#[test]
fn test_serve_overrides() {
    let matches = build_cli()
        .try_get_matches_from(["oauthd", "serve", "--host", "0.0.0.0", "--port", "9096"])
        .unwrap();
    let (name, sub) = matches.subcommand().unwrap();
    assert_eq!(name, "serve");

    let http = http_overrides(&Config::default(), sub);
    assert_eq!(http.host, "0.0.0.0");
    assert_eq!(http.port, 9096);
}

#[test]
fn test_serve_defaults_from_config() {
    let matches = build_cli()
        .try_get_matches_from(["oauthd", "serve"])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    let http = http_overrides(&Config::default(), sub);
    assert_eq!(http.host, crate::constants::DEFAULT_HTTP_HOST);
    assert_eq!(http.port, crate::constants::DEFAULT_HTTP_PORT);
}

#[test]
fn test_rejects_port_zero() {
    let result = build_cli().try_get_matches_from(["oauthd", "serve", "--port", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_global_config_flag() {
    let matches = build_cli()
        .try_get_matches_from(["oauthd", "client", "list", "--config", "custom.yaml"])
        .unwrap();
    assert_eq!(
        matches.get_one::<String>("config").map(String::as_str),
        Some("custom.yaml")
    );
}

#[test]
fn test_register_requires_id() {
    let result = build_cli().try_get_matches_from(["oauthd", "client", "register"]);
    assert!(result.is_err());

    let matches = build_cli()
        .try_get_matches_from(["oauthd", "client", "register", "--id", "000000"])
        .unwrap();
    let (_, client) = matches.subcommand().unwrap();
    let (name, register) = client.subcommand().unwrap();
    assert_eq!(name, "register");
    assert_eq!(required(register, "id").unwrap(), "000000");
    assert_eq!(optional(register, "scope"), "");
    assert!(register.get_one::<String>("secret").is_none());
}

#[tokio::test]
async fn test_register_client_with_secret() {
    let storage = memory_storage();
    let client = register_client(
        &storage,
        "000000",
        Some("999999".to_string()),
        "http://localhost",
        "read write",
    )
    .await
    .unwrap();
    assert_eq!(client.secret, "999999");

    let stored = storage.get_client("000000").await.unwrap().unwrap();
    assert_eq!(stored.secret, "999999");
    assert_eq!(stored.scopes(), vec!["read", "write"]);
}

#[tokio::test]
async fn test_register_client_generates_secret() {
    let storage = memory_storage();
    let client = tokio_test::assert_ok!(register_client(&storage, "svc", None, "", "read").await);
    assert_eq!(client.secret.len(), 43);
    assert!(storage.get_client("svc").await.unwrap().is_some());
}

#[tokio::test]
async fn test_register_client_rejects_blank_id() {
    let storage = memory_storage();
    let err = tokio_test::assert_err!(
        register_client(&storage, "  ", Some("s".to_string()), "", "").await
    );
    assert!(matches!(err, crate::OauthdError::Validation(_)));
    assert!(storage.list_clients().await.unwrap().is_empty());
}
