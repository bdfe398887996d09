// Plutus — Store Module
//
// SQLite persistence for operator keys, account keys, escrow wallets,
// simple wallets, API credential verifiers and the audit trail.

mod db;
mod error;
mod models;
mod repository;

pub use db::Database;
pub use error::StoreError;
pub use models::{
    AccountKey, ApiCredential, AuditEntry, CredentialStatus, CredentialSummary, EscrowWallet,
    NewEscrowWallet, OperatorKey, SimpleWallet,
};
pub use repository::{
    AccountKeyStore, ApiCredentialStore, AuditLog, EscrowWalletStore, OperatorKeyStore,
    SimpleWalletStore, SqliteStore,
};
