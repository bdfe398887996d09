// Plutus — API Credential Authority
//
// Issues opaque bearer secrets and validates presented ones. Only the
// SHA-256 verifier of a secret is persisted; the secret itself is handed
// back once, inside a zeroizing buffer, and never logged.

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::CustodyError;
use crate::store::{ApiCredentialStore, AuditLog, CredentialSummary};

/// Bytes of entropy in a generated secret (256 bits).
const SECRET_LEN: usize = 32;

/// A freshly issued credential. The secret is wiped from memory on drop.
pub struct IssuedCredential {
    pub id: Uuid,
    secret: Zeroizing<String>,
}

impl IssuedCredential {
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The value to send in the `Authorization` header.
    pub fn bearer_header(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("Authorization: Bearer {}", self.secret.as_str()))
    }
}

impl fmt::Debug for IssuedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCredential")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

pub struct CredentialAuthority {
    store: Arc<dyn ApiCredentialStore>,
    audit: Arc<dyn AuditLog>,
}

impl CredentialAuthority {
    pub fn new(store: Arc<dyn ApiCredentialStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Generate a new secret, persist its verifier and return the secret.
    pub fn issue(&self, actor: &str) -> Result<IssuedCredential, CustodyError> {
        let mut raw = Zeroizing::new(vec![0u8; SECRET_LEN]);
        rand::rng().fill_bytes(&mut raw);
        let secret = Zeroizing::new(hex::encode(raw.as_slice()));

        let cred = self
            .store
            .insert_api_credential(&verifier(&secret))
            .map_err(CustodyError::CredentialStoreUnavailable)?;

        if let Err(e) = self.audit.record(&cred.id.to_string(), "issued", actor, None) {
            tracing::warn!(credential_id = %cred.id, error = %e, "Failed to audit credential issue");
        }
        tracing::info!(credential_id = %cred.id, "API credential issued");

        Ok(IssuedCredential { id: cred.id, secret })
    }

    /// Check a presented secret against the active verifiers.
    ///
    /// Returns `Ok(false)` for unknown or revoked secrets; errors only when
    /// the store cannot be reached. The lookup is keyed on the digest, so
    /// timing depends on the hash of the secret, never on its content, and
    /// the final comparison is constant time.
    pub fn validate(&self, presented: &str) -> Result<bool, CustodyError> {
        if presented.is_empty() {
            return Ok(false);
        }

        let computed = verifier(presented);
        let stored = self
            .store
            .active_api_credential(&computed)
            .map_err(CustodyError::CredentialStoreUnavailable)?;

        Ok(match stored {
            Some(cred) => constant_time_eq(cred.verifier().as_bytes(), computed.as_bytes()),
            None => false,
        })
    }

    /// Revoke a credential. Returns false if it was unknown or already revoked.
    pub fn revoke(&self, id: &Uuid, actor: &str) -> Result<bool, CustodyError> {
        let revoked = self
            .store
            .revoke_api_credential(id)
            .map_err(CustodyError::CredentialStoreUnavailable)?;

        if revoked {
            if let Err(e) = self.audit.record(&id.to_string(), "revoked", actor, None) {
                tracing::warn!(credential_id = %id, error = %e, "Failed to audit credential revoke");
            }
            tracing::info!(credential_id = %id, "API credential revoked");
        }
        Ok(revoked)
    }

    pub fn list(&self) -> Result<Vec<CredentialSummary>, CustodyError> {
        let creds = self
            .store
            .api_credentials()
            .map_err(CustodyError::CredentialStoreUnavailable)?;
        Ok(creds.iter().map(|c| c.summary()).collect())
    }
}

/// Hex SHA-256 of the secret.
fn verifier(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Compares every byte regardless of where the first difference is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ─── Tests ───────────────────────────────────────────────────────────────────
