// Plutus — Custody Module
//
// Key custody and escrow provisioning: operator keys, per-account public
// keys, 2-of-3 multisig creation, API credentials and plain wallet labels.

mod credentials;
mod error;
mod keyring;
mod ledger;
mod provisioner;
pub mod pubkey;
mod registry;

pub use credentials::{CredentialAuthority, IssuedCredential};
pub use error::CustodyError;
pub use keyring::OperatorKeyring;
pub use ledger::SimpleWalletLedger;
pub use provisioner::{MultisigProvisioner, REQUIRED_SIGNATURES};
pub use pubkey::SignerRole;
pub use registry::{AccountKeyRegistry, MAX_ACCOUNT_ID_LEN};
