// Plutus — Wallet RPC error types

use thiserror::Error;

use super::protocol::WALLET_PASSPHRASE_INCORRECT;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Wallet node error {code}: {message}")]
    Node { code: i32, message: String },

    #[error("Unexpected response for {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// True if the node rejected a wallet unlock because of a wrong passphrase.
    pub fn is_wrong_passphrase(&self) -> bool {
        matches!(self, RpcError::Node { code, .. } if *code == WALLET_PASSPHRASE_INCORRECT)
    }
}
