// Plutus — Account Key Registry
//
// One public key per customer or vendor account. Resubmitting for the same
// account replaces the stored key.

use std::sync::Arc;

use super::{pubkey, CustodyError, SignerRole};
use crate::store::AccountKeyStore;

/// Upper bound on account identifiers accepted from callers.
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

pub struct AccountKeyRegistry {
    store: Arc<dyn AccountKeyStore>,
}

impl AccountKeyRegistry {
    pub fn new(store: Arc<dyn AccountKeyStore>) -> Self {
        Self { store }
    }

    pub fn submit(&self, account_id: &str, public_key: &[u8]) -> Result<(), CustodyError> {
        validate_account_id(account_id, "accountID")?;
        if public_key.is_empty() {
            return Err(CustodyError::InvalidInput { field: "publicKey" });
        }
        let normalized = pubkey::normalize(public_key)
            .ok_or(CustodyError::InvalidPublicKey { field: "publicKey" })?;

        self.store.upsert_account_key(account_id, &normalized)?;
        tracing::info!(account_id = %account_id, "Account public key stored");
        Ok(())
    }

    /// The stored key for `account_id`. `role` names the side that is
    /// missing when nothing is registered.
    pub fn lookup(&self, account_id: &str, role: SignerRole) -> Result<Vec<u8>, CustodyError> {
        match self.store.account_key(account_id)? {
            Some(key) => Ok(key.public_key),
            None => Err(CustodyError::PublicKeyNotFound { field: role }),
        }
    }
}

pub(crate) fn validate_account_id(account_id: &str, field: &'static str) -> Result<(), CustodyError> {
    let trimmed = account_id.trim();
    if trimmed.is_empty()
        || trimmed.len() != account_id.len()
        || account_id.len() > MAX_ACCOUNT_ID_LEN
        || account_id.chars().any(char::is_control)
    {
        return Err(CustodyError::InvalidInput { field });
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
