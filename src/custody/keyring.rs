// Plutus — Operator Keyring
//
// Operator keys are the platform's neutral third signer. One is picked per
// provisioning request, uniformly at random, to spread signing load. The
// generator is seeded once when the keyring is built and lives as long as
// the process.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{pubkey, CustodyError};
use crate::store::{AuditLog, OperatorKey, OperatorKeyStore, StoreError};

pub struct OperatorKeyring {
    store: Arc<dyn OperatorKeyStore>,
    audit: Arc<dyn AuditLog>,
    rng: Mutex<StdRng>,
}

impl OperatorKeyring {
    pub fn new(store: Arc<dyn OperatorKeyStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self::with_rng(store, audit, StdRng::from_os_rng())
    }

    pub fn with_rng(store: Arc<dyn OperatorKeyStore>, audit: Arc<dyn AuditLog>, rng: StdRng) -> Self {
        Self {
            store,
            audit,
            rng: Mutex::new(rng),
        }
    }

    /// Load every operator key and return one, chosen uniformly.
    pub fn select_key(&self) -> Result<Vec<u8>, CustodyError> {
        let mut keys = self.store.operator_keys()?;
        if keys.is_empty() {
            return Err(CustodyError::NoOperatorKeysConfigured);
        }

        let idx = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.random_range(0..keys.len())
        };
        Ok(keys.swap_remove(idx).public_key)
    }

    /// Validate and store a new operator key in compressed form.
    pub fn register(&self, public_key: &[u8], actor: &str) -> Result<OperatorKey, CustodyError> {
        let normalized = pubkey::normalize(public_key)
            .ok_or(CustodyError::InvalidPublicKey { field: "operator" })?;

        let key = self
            .store
            .insert_operator_key(&normalized)
            .map_err(|e| match e {
                StoreError::Conflict(_) => CustodyError::DuplicateOperatorKey,
                other => CustodyError::Store(other),
            })?;

        let details = hex::encode(&key.public_key);
        if let Err(e) = self
            .audit
            .record(&key.id.to_string(), "operator_key_registered", actor, Some(&details))
        {
            tracing::warn!(operator_key_id = %key.id, error = %e, "Failed to audit operator key");
        }
        Ok(key)
    }

    pub fn keys(&self) -> Result<Vec<OperatorKey>, CustodyError> {
        Ok(self.store.operator_keys()?)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::pubkey::fixtures;
    use crate::store::{Database, SqliteStore};
    use std::collections::HashMap;

    fn keyring(seed: u64) -> OperatorKeyring {
        let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
        OperatorKeyring::with_rng(
            Arc::new(store.clone()),
            Arc::new(store),
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_empty_keyring_is_misconfiguration() {
        let keyring = keyring(1);
        assert!(matches!(
            keyring.select_key().unwrap_err(),
            CustodyError::NoOperatorKeysConfigured
        ));
    }

    #[test]
    fn test_register_normalizes_to_compressed() {
        let keyring = keyring(1);
        let key = keyring.register(&fixtures::uncompressed(3), "test").unwrap();
        assert_eq!(key.public_key, fixtures::compressed(3));
        assert_eq!(keyring.select_key().unwrap(), fixtures::compressed(3));
    }

    #[test]
    fn test_duplicate_registration_leaves_set_unchanged() {
        let keyring = keyring(1);
        keyring.register(&fixtures::compressed(3), "test").unwrap();

        // Same point, other encoding.
        let err = keyring.register(&fixtures::uncompressed(3), "test").unwrap_err();
        assert!(matches!(err, CustodyError::DuplicateOperatorKey), "got {:?}", err);
        assert_eq!(keyring.keys().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_key_is_rejected() {
        let keyring = keyring(1);
        let err = keyring.register(b"definitely not a key", "test").unwrap_err();
        assert!(matches!(err, CustodyError::InvalidPublicKey { field: "operator" }));
        assert!(keyring.keys().unwrap().is_empty());
    }

    #[test]
    fn test_selection_is_roughly_uniform() {
        let keyring = keyring(42);
        for seed in 1..=4 {
            keyring.register(&fixtures::compressed(seed), "test").unwrap();
        }

        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();
        for _ in 0..4000 {
            *counts.entry(keyring.select_key().unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), 4);
        for (key, count) in &counts {
            assert!(
                (800..=1200).contains(count),
                "key {} selected {} times out of 4000",
                hex::encode(key),
                count
            );
        }
    }
}
