// Plutus — Persisted row models
//
// Public keys are stored as their 33-byte compressed SEC1 encoding.
// API credentials are stored only as a verifier; the verifier is kept
// out of Debug output and serialized listings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A public key under platform control, used as the neutral third signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorKey {
    pub id: Uuid,
    pub public_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// The public key registered for a customer or vendor account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub account_id: String,
    pub public_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for persisting a freshly provisioned escrow wallet.
#[derive(Debug, Clone)]
pub struct NewEscrowWallet {
    pub customer_account: String,
    pub vendor_account: String,
    pub customer_key: Vec<u8>,
    pub operator_key: Vec<u8>,
    pub vendor_key: Vec<u8>,
    pub address: String,
    pub redeem_script: String,
}

/// A 2-of-3 escrow wallet. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowWallet {
    pub id: Uuid,
    pub customer_account: String,
    pub vendor_account: String,
    pub customer_key: Vec<u8>,
    pub operator_key: Vec<u8>,
    pub vendor_key: Vec<u8>,
    pub address: String,
    pub redeem_script: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for EscrowWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} / {})",
            self.id, self.address, self.customer_account, self.vendor_account
        )
    }
}

/// A label to address binding for a non-escrow node-side account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleWallet {
    pub label: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of an API credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Active,
    Revoked,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Active => "active",
            CredentialStatus::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CredentialStatus::Active),
            "revoked" => Some(CredentialStatus::Revoked),
            _ => None,
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored API credential. `verifier` is the hex SHA-256 of the secret.
#[derive(Clone)]
pub struct ApiCredential {
    pub id: Uuid,
    verifier: String,
    pub status: CredentialStatus,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiCredential {
    pub fn new(
        id: Uuid,
        verifier: String,
        status: CredentialStatus,
        created_at: DateTime<Utc>,
        revoked_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            verifier,
            status,
            created_at,
            revoked_at,
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            id: self.id,
            status: self.status,
            created_at: self.created_at,
            revoked_at: self.revoked_at,
        }
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("id", &self.id)
            .field("verifier", &"[REDACTED]")
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("revoked_at", &self.revoked_at)
            .finish()
    }
}

/// Listing view of a credential. Never contains the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub id: Uuid,
    pub status: CredentialStatus,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl fmt::Display for CredentialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (created {})",
            self.id,
            self.status,
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// One audit log line.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub subject: String,
    pub action: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by '{}'",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.action,
            self.actor
        )?;
        if let Some(ref d) = self.details {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
