//! Command-line interface for oauthd
//!
//! `serve` runs the HTTP server; `client` manages the client directory.

use crate::Result;
use crate::auth::generate_client_secret;
use crate::config::{Config, HttpConfig};
use crate::model::Client;
use crate::storage::{ClientStore, Storage};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::sync::Arc;

/// Main CLI entry point
pub async fn run() -> Result<()> {
    let matches = build_cli().get_matches();

    let config = load_config(&matches)?;
    crate::init_logging(config.log_level());

    match matches.subcommand() {
        Some(("serve", sub)) => handle_serve_command(config, sub).await,
        Some(("client", sub)) => handle_client_command(&config, sub).await,
        _ => Ok(()),
    }
}

/// Build the command tree
pub fn build_cli() -> Command {
    Command::new("oauthd")
        .about("oauthd - OAuth2 authorization server")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Path to the config file (JSON or YAML)"),
        )
        .subcommand(
            Command::new("serve")
                .about("Start the HTTP server")
                .arg(Arg::new("host").long("host").help("Server host"))
                .arg(
                    Arg::new("port")
                        .long("port")
                        .short('p')
                        .value_parser(clap::value_parser!(u16).range(1..))
                        .help("Server port"),
                ),
        )
        .subcommand(
            Command::new("client")
                .about("Client directory management")
                .subcommand_required(true)
                .subcommand(
                    Command::new("register")
                        .about("Register or update a client")
                        .arg(Arg::new("id").long("id").required(true))
                        .arg(
                            Arg::new("secret")
                                .long("secret")
                                .help("Client secret (generated when omitted)"),
                        )
                        .arg(Arg::new("domain").long("domain").help("Registered domain"))
                        .arg(Arg::new("scope").long("scope").help("Space-delimited granted scope"))
                        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
                )
                .subcommand(
                    Command::new("list")
                        .about("List registered clients")
                        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a client")
                        .arg(Arg::new("id").required(true).index(1)),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    match matches.get_one::<String>("config") {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

/// Apply `--host` / `--port` over the configured HTTP settings
fn http_overrides(config: &Config, matches: &ArgMatches) -> HttpConfig {
    let mut http = config.http_config();
    if let Some(host) = matches.get_one::<String>("host") {
        http.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        http.port = *port;
    }
    http
}

async fn handle_serve_command(mut config: Config, matches: &ArgMatches) -> Result<()> {
    config.http = Some(http_overrides(&config, matches));
    config.validate()?;
    crate::http::start_server(config).await
}

async fn handle_client_command(config: &Config, matches: &ArgMatches) -> Result<()> {
    let storage = crate::storage::create_storage_from_config(&config.storage).await?;

    match matches.subcommand() {
        Some(("register", sub)) => {
            let client = register_client(
                &storage,
                required(sub, "id")?,
                sub.get_one::<String>("secret").cloned(),
                optional(sub, "domain"),
                optional(sub, "scope"),
            )
            .await?;

            if sub.get_flag("json") {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "client_id": client.id,
                        "client_secret": client.secret,
                        "scope": client.scope,
                    }))?
                );
            } else {
                println!("Client registered");
                println!("Client ID:     {}", client.id);
                println!("Client Secret: {}", client.secret);
            }
        }
        Some(("list", sub)) => {
            let clients = storage.list_clients().await?;

            if sub.get_flag("json") {
                let listed: Vec<_> = clients
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "client_id": c.id,
                            "domain": c.domain,
                            "scope": c.scope,
                            "created_at": c.created_at,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                println!("Clients:");
                for client in clients {
                    println!("  {} [{}] {}", client.id, client.scope, client.domain);
                }
            }
        }
        Some(("delete", sub)) => {
            let id = required(sub, "id")?;
            if storage.delete_client(id).await? {
                println!("Client '{}' deleted", id);
            } else {
                return Err(crate::OauthdError::not_found("client", id));
            }
        }
        _ => {}
    }
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, key: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(key)
        .map(String::as_str)
        .ok_or_else(|| crate::OauthdError::validation(format!("--{} is required", key)))
}

fn optional<'a>(matches: &'a ArgMatches, key: &str) -> &'a str {
    matches
        .get_one::<String>(key)
        .map(String::as_str)
        .unwrap_or_default()
}

/// Validate and persist a client, generating a secret when none is given
pub async fn register_client(
    storage: &Arc<dyn Storage>,
    id: &str,
    secret: Option<String>,
    domain: &str,
    scope: &str,
) -> Result<Client> {
    let secret = secret.unwrap_or_else(generate_client_secret);
    let client = Client::new(id, secret, domain, scope);
    client.validate()?;

    storage.save_client(&client).await?;
    tracing::info!(client_id = %client.id, "Client registered");
    Ok(client)
}

#[cfg(test)]
mod cli_test;
