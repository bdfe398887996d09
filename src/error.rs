// Plutus — Top-level error types
//
// Aggregates module errors for the binary boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlutusError {
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("{0}")]
    Custody(#[from] crate::custody::CustodyError),

    #[error("Wallet RPC error: {0}")]
    Rpc(#[from] crate::rpc::RpcError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PlutusError>;
