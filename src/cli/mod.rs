// Plutus — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: serve, gen-api-key, revoke-api-key, list-api-keys,
// add-operator-key, list-operator-keys, audit.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::execute;

/// Plutus — escrow key custody for a bitcoin payment gateway.
#[derive(Parser, Debug)]
#[command(name = "plutus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file. Defaults to the platform data directory.
    #[arg(long, global = true, env = "PLUTUS_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway.
    Serve,

    /// Generate an API credential and print it once as an Authorization header.
    GenApiKey,

    /// Revoke an API credential by ID.
    RevokeApiKey {
        /// The UUID printed by `list-api-keys`.
        id: String,
    },

    /// List API credentials (IDs and status only).
    ListApiKeys,

    /// Register an operator public key (hex SEC1, compressed or uncompressed).
    AddOperatorKey {
        public_key: String,
    },

    /// List registered operator public keys.
    ListOperatorKeys,

    /// Show the audit trail for a credential ID, operator key ID or escrow address.
    Audit {
        subject: String,
    },
}
