//! oauthd CLI - OAuth2 authorization server
//!
//! Run with: cargo run --bin oauthd -- <command>
//! Or after build: ./target/release/oauthd <command>

#[tokio::main]
async fn main() {
    // Load .env file as early as possible so `$env:` config values resolve
    let _ = dotenvy::dotenv();

    // Logging is initialised by the CLI once the config (and its log level) is known
    if let Err(e) = oauthd::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
