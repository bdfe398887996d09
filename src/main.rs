// Plutus — Application Entry Point
//
// Loads `.env`, initializes structured logging and dispatches the parsed
// command. Secrets are never logged at any level.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use plutus::cli::{execute, Cli};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    // RUST_LOG=plutus=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plutus=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
