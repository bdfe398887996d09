// Plutus — Custody error types

use thiserror::Error;

use super::pubkey::SignerRole;
use crate::rpc::RpcError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CustodyError {
    #[error("Missing or malformed field: {field}")]
    InvalidInput { field: &'static str },

    #[error("Failed to find a public key for the {field}")]
    PublicKeyNotFound { field: SignerRole },

    #[error("No operator keys are configured")]
    NoOperatorKeysConfigured,

    #[error("Invalid public key: {field}")]
    InvalidPublicKey { field: &'static str },

    #[error("Customer, vendor and operator keys must be pairwise distinct")]
    DuplicateSignerKey,

    #[error("Operator key is already registered")]
    DuplicateOperatorKey,

    #[error("Label '{label}' is already bound to a different address")]
    DuplicateLabel { label: String },

    #[error("Escrow provisioning already in progress for this customer and vendor")]
    ProvisioningInProgress,

    #[error("Wallet node failed to create the multisig address: {0}")]
    ProvisioningFailed(#[source] RpcError),

    #[error("Escrow address {address} exists on the wallet node but was not recorded: {source}")]
    PersistenceFailed {
        address: String,
        #[source]
        source: StoreError,
    },

    #[error("Provisioning task aborted: {0}")]
    Aborted(String),

    #[error("Credential store unavailable: {0}")]
    CredentialStoreUnavailable(#[source] StoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Wallet RPC error: {0}")]
    Rpc(#[from] RpcError),
}

impl CustodyError {
    /// The request field a caller should correct, if the error points at one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            CustodyError::InvalidInput { field } => Some(*field),
            CustodyError::InvalidPublicKey { field } => Some(*field),
            CustodyError::PublicKeyNotFound { field } => Some(field.as_str()),
            _ => None,
        }
    }
}
