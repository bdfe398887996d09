// Plutus — CLI Command Handlers
//
// Each function handles one CLI subcommand. Maintenance commands open the
// database directly; `serve` wires the custody components to the wallet
// node and starts the HTTP gateway.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::api::{self, AppState, RouteThrottles};
use crate::config::{default_db_path, Config};
use crate::custody::{
    AccountKeyRegistry, CredentialAuthority, MultisigProvisioner, OperatorKeyring, SimpleWalletLedger,
};
use crate::error::PlutusError;
use crate::rpc::{HttpWalletRpc, WalletRpc};
use crate::store::{AuditLog, Database, SqliteStore};

use super::{Cli, Commands};

/// Recorded as the actor for changes made from the command line.
const CLI_ACTOR: &str = "plutus-cli";

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), PlutusError> {
    let db_path = cli.db_path;
    match cli.command {
        Commands::Serve => cmd_serve(db_path).await,
        Commands::GenApiKey => cmd_gen_api_key(&resolve(db_path)),
        Commands::RevokeApiKey { id } => cmd_revoke_api_key(&resolve(db_path), &id),
        Commands::ListApiKeys => cmd_list_api_keys(&resolve(db_path)),
        Commands::AddOperatorKey { public_key } => cmd_add_operator_key(&resolve(db_path), &public_key),
        Commands::ListOperatorKeys => cmd_list_operator_keys(&resolve(db_path)),
        Commands::Audit { subject } => cmd_audit(&resolve(db_path), &subject),
    }
}

fn resolve(db_path: Option<PathBuf>) -> PathBuf {
    db_path.unwrap_or_else(default_db_path)
}

fn open_store(path: &Path) -> Result<SqliteStore, PlutusError> {
    let db = Database::open(path)?;
    Ok(SqliteStore::new(Arc::new(db)))
}

fn parse_id(id: &str) -> Result<Uuid, PlutusError> {
    Uuid::parse_str(id).map_err(|e| PlutusError::Other(format!("Invalid UUID: {}", e)))
}

// ─── API Credentials ─────────────────────────────────────────────────────────

fn cmd_gen_api_key(path: &Path) -> Result<(), PlutusError> {
    let store = open_store(path)?;
    let authority = CredentialAuthority::new(Arc::new(store.clone()), Arc::new(store));

    let issued = authority.issue(CLI_ACTOR)?;
    let header = issued.bearer_header();

    println!("✓ API credential {} created. It is shown only once:", issued.id);
    println!();
    println!("{}", header.as_str());

    Ok(())
}

fn cmd_revoke_api_key(path: &Path, id: &str) -> Result<(), PlutusError> {
    let id = parse_id(id)?;
    let store = open_store(path)?;
    let authority = CredentialAuthority::new(Arc::new(store.clone()), Arc::new(store));

    if authority.revoke(&id, CLI_ACTOR)? {
        println!("✓ API credential {} revoked", id);
    } else {
        println!("No active API credential with ID {}", id);
    }
    Ok(())
}

fn cmd_list_api_keys(path: &Path) -> Result<(), PlutusError> {
    let store = open_store(path)?;
    let authority = CredentialAuthority::new(Arc::new(store.clone()), Arc::new(store));

    let creds = authority.list()?;
    if creds.is_empty() {
        println!("No API credentials yet. Create one with: plutus gen-api-key");
        return Ok(());
    }

    println!("API credentials ({}):\n", creds.len());
    for cred in &creds {
        println!("  {}", cred);
    }
    Ok(())
}

// ─── Operator Keys ───────────────────────────────────────────────────────────

fn cmd_add_operator_key(path: &Path, public_key: &str) -> Result<(), PlutusError> {
    let bytes = hex::decode(public_key.trim())
        .map_err(|e| PlutusError::Other(format!("Public key is not valid hex: {}", e)))?;

    let store = open_store(path)?;
    let keyring = OperatorKeyring::new(Arc::new(store.clone()), Arc::new(store));
    let key = keyring.register(&bytes, CLI_ACTOR)?;

    println!("✓ Operator key registered");
    println!("  ID:  {}", key.id);
    println!("  Key: {}", hex::encode(&key.public_key));
    Ok(())
}

fn cmd_list_operator_keys(path: &Path) -> Result<(), PlutusError> {
    let store = open_store(path)?;
    let keyring = OperatorKeyring::new(Arc::new(store.clone()), Arc::new(store));

    let keys = keyring.keys()?;
    if keys.is_empty() {
        println!("No operator keys registered. Escrow provisioning will fail until one is added:");
        println!("  plutus add-operator-key <hex public key>");
        return Ok(());
    }

    println!("Operator keys ({}):\n", keys.len());
    for key in &keys {
        println!(
            "  {} │ {} │ {}",
            key.id,
            hex::encode(&key.public_key),
            key.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

// ─── Audit ───────────────────────────────────────────────────────────────────

fn cmd_audit(path: &Path, subject: &str) -> Result<(), PlutusError> {
    let store = open_store(path)?;
    let entries = store.entries(subject)?;

    if entries.is_empty() {
        println!("No audit entries for: {}", subject);
        return Ok(());
    }

    println!("Audit log for: {}", subject);
    println!("{:-<80}", "");
    for entry in entries {
        println!("{}", entry);
    }
    println!("{:-<80}", "");
    Ok(())
}

// ─── Serve ───────────────────────────────────────────────────────────────────

async fn cmd_serve(db_path: Option<PathBuf>) -> Result<(), PlutusError> {
    let mut config = Config::from_env()?;
    if let Some(path) = db_path {
        config.db_path = path;
    }
    tracing::debug!(config = ?config, "Loaded configuration");

    let store = open_store(&config.db_path)?;
    let rpc: Arc<dyn WalletRpc> = Arc::new(HttpWalletRpc::new(
        config.rpc_url.clone(),
        config.rpc_user.clone(),
        config.rpc_password.clone(),
        config.rpc_timeout,
    )?);

    let credentials = Arc::new(CredentialAuthority::new(Arc::new(store.clone()), Arc::new(store.clone())));
    let registry = Arc::new(AccountKeyRegistry::new(Arc::new(store.clone())));
    let keyring = Arc::new(OperatorKeyring::new(Arc::new(store.clone()), Arc::new(store.clone())));

    match keyring.keys() {
        Ok(keys) if keys.is_empty() => {
            tracing::warn!("No operator keys registered; /multisig will answer 503 until one is added");
        }
        Ok(keys) => tracing::info!(operator_keys = keys.len(), "Operator keyring loaded"),
        Err(e) => return Err(e.into()),
    }
    if config.wallet_passphrase.is_none() {
        tracing::warn!("WALLET_PASS is not set; /wallet/unlock is disabled");
    }

    let provisioner = Arc::new(MultisigProvisioner::new(
        Arc::clone(&registry),
        keyring,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(&rpc),
    ));

    let state = Arc::new(AppState {
        credentials,
        registry,
        provisioner,
        ledger: Arc::new(SimpleWalletLedger::new(Arc::new(store))),
        rpc,
        wallet_passphrase: config.wallet_passphrase.clone(),
        unlock_secs: config.unlock_secs,
        throttles: RouteThrottles::new(config.throttle_rate_per_sec, config.throttle_max_wait),
    });

    tracing::info!(
        db = %config.db_path.display(),
        wallet_rpc = %config.rpc_url,
        rate_per_sec = config.throttle_rate_per_sec,
        "Starting Plutus gateway"
    );
    api::serve(state, config.bind_addr, config.request_timeout).await?;
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::pubkey::fixtures;
    use crate::store::{ApiCredentialStore, CredentialStatus, OperatorKeyStore};
    use clap::Parser;

    #[test]
    fn test_cli_parses_global_db_path() {
        let cli = Cli::try_parse_from(["plutus", "--db-path", "/tmp/x.db", "gen-api-key"]).unwrap();
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Commands::GenApiKey));

        let cli = Cli::try_parse_from(["plutus", "audit", "bc1qabc", "--db-path", "/tmp/y.db"]).unwrap();
        assert!(matches!(cli.command, Commands::Audit { ref subject } if subject == "bc1qabc"));
    }

    #[test]
    fn test_maintenance_commands_against_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("plutus.db");

        cmd_gen_api_key(&path).unwrap();
        cmd_add_operator_key(&path, &hex::encode(fixtures::uncompressed(4))).unwrap();

        let store = open_store(&path).unwrap();
        let creds = store.api_credentials().unwrap();
        assert_eq!(creds.len(), 1);
        let keys = store.operator_keys().unwrap();
        assert_eq!(keys[0].public_key, fixtures::compressed(4));

        cmd_revoke_api_key(&path, &creds[0].id.to_string()).unwrap();
        assert_eq!(
            store.api_credentials().unwrap()[0].status,
            CredentialStatus::Revoked
        );

        cmd_list_api_keys(&path).unwrap();
        cmd_list_operator_keys(&path).unwrap();
        cmd_audit(&path, &creds[0].id.to_string()).unwrap();
    }

    #[test]
    fn test_bad_operator_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plutus.db");

        assert!(cmd_add_operator_key(&path, "not hex").is_err());
        assert!(cmd_add_operator_key(&path, "02abcd").is_err());
        assert!(cmd_revoke_api_key(&path, "not-a-uuid").is_err());
    }
}
