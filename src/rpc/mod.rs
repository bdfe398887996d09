// Plutus — Wallet RPC Module
//
// JSON-RPC client for the wallet node that builds multisig scripts and
// moves funds on behalf of the gateway.

mod client;
mod error;
mod protocol;

pub use client::{HttpWalletRpc, MultisigAddress, WalletRpc};
pub use error::RpcError;
pub use protocol::WALLET_PASSPHRASE_INCORRECT;
