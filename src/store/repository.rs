// Plutus — Repository layer
//
// One trait per persisted entity so the custody components can be handed
// exactly the storage they need (and tests can swap in failing stores).
// `SqliteStore` implements all of them over the shared `Database`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::db::Database;
use super::models::{
    AccountKey, ApiCredential, AuditEntry, CredentialStatus, EscrowWallet, NewEscrowWallet,
    OperatorKey, SimpleWallet,
};
use super::StoreError;

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Storage for operator-controlled signer keys.
pub trait OperatorKeyStore: Send + Sync {
    /// Insert a key. Fails with `Conflict` if the bytes are already present.
    fn insert_operator_key(&self, public_key: &[u8]) -> Result<OperatorKey, StoreError>;

    /// Load every operator key.
    fn operator_keys(&self) -> Result<Vec<OperatorKey>, StoreError>;
}

/// Storage for per-account public keys, one row per account identifier.
pub trait AccountKeyStore: Send + Sync {
    /// Insert or replace the key for `account_id`.
    fn upsert_account_key(&self, account_id: &str, public_key: &[u8]) -> Result<(), StoreError>;

    fn account_key(&self, account_id: &str) -> Result<Option<AccountKey>, StoreError>;
}

/// Storage for provisioned escrow wallets.
pub trait EscrowWalletStore: Send + Sync {
    /// Persist a wallet. If a wallet with the same address already exists
    /// the stored row is returned unchanged.
    fn insert_escrow_wallet(&self, wallet: &NewEscrowWallet) -> Result<EscrowWallet, StoreError>;

    fn escrow_wallet(&self, address: &str) -> Result<Option<EscrowWallet>, StoreError>;

    fn escrow_wallets_for_pair(
        &self,
        customer_account: &str,
        vendor_account: &str,
    ) -> Result<Vec<EscrowWallet>, StoreError>;
}

/// Storage for label to address bindings of plain node-side accounts.
pub trait SimpleWalletStore: Send + Sync {
    fn simple_wallet(&self, label: &str) -> Result<Option<SimpleWallet>, StoreError>;

    /// Insert a binding. Fails with `Conflict` if the label is taken.
    fn insert_simple_wallet(&self, label: &str, address: &str) -> Result<SimpleWallet, StoreError>;
}

/// Storage for API credential verifiers.
pub trait ApiCredentialStore: Send + Sync {
    fn insert_api_credential(&self, verifier: &str) -> Result<ApiCredential, StoreError>;

    /// Look up an active credential by verifier.
    fn active_api_credential(&self, verifier: &str) -> Result<Option<ApiCredential>, StoreError>;

    fn api_credentials(&self) -> Result<Vec<ApiCredential>, StoreError>;

    /// Mark a credential revoked. Returns false if it was unknown or already revoked.
    fn revoke_api_credential(&self, id: &Uuid) -> Result<bool, StoreError>;
}

/// Append-only audit trail.
pub trait AuditLog: Send + Sync {
    fn record(
        &self,
        subject: &str,
        action: &str,
        actor: &str,
        details: Option<&str>,
    ) -> Result<(), StoreError>;

    fn entries(&self, subject: &str) -> Result<Vec<AuditEntry>, StoreError>;
}

// ─── SQLite Implementation ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
        Uuid::parse_str(s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn parse_time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_operator_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<OperatorKey> {
        let id: String = row.get(0)?;
        let created_at: String = row.get(2)?;
        Ok(OperatorKey {
            id: Self::parse_uuid(0, &id)?,
            public_key: row.get(1)?,
            created_at: Self::parse_time(&created_at),
        })
    }

    fn row_to_account_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountKey> {
        let created_at: String = row.get(2)?;
        let updated_at: String = row.get(3)?;
        Ok(AccountKey {
            account_id: row.get(0)?,
            public_key: row.get(1)?,
            created_at: Self::parse_time(&created_at),
            updated_at: Self::parse_time(&updated_at),
        })
    }

    fn row_to_escrow_wallet(row: &rusqlite::Row<'_>) -> rusqlite::Result<EscrowWallet> {
        let id: String = row.get(0)?;
        let created_at: String = row.get(8)?;
        Ok(EscrowWallet {
            id: Self::parse_uuid(0, &id)?,
            customer_account: row.get(1)?,
            vendor_account: row.get(2)?,
            customer_key: row.get(3)?,
            operator_key: row.get(4)?,
            vendor_key: row.get(5)?,
            address: row.get(6)?,
            redeem_script: row.get(7)?,
            created_at: Self::parse_time(&created_at),
        })
    }

    fn row_to_simple_wallet(row: &rusqlite::Row<'_>) -> rusqlite::Result<SimpleWallet> {
        let created_at: String = row.get(2)?;
        Ok(SimpleWallet {
            label: row.get(0)?,
            address: row.get(1)?,
            created_at: Self::parse_time(&created_at),
        })
    }

    fn row_to_api_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApiCredential> {
        let id: String = row.get(0)?;
        let verifier: String = row.get(1)?;
        let status: String = row.get(2)?;
        let created_at: String = row.get(3)?;
        let revoked_at: Option<String> = row.get(4)?;

        // Unknown status text is treated as revoked so it can never authenticate.
        let status = CredentialStatus::parse(&status).unwrap_or(CredentialStatus::Revoked);

        Ok(ApiCredential::new(
            Self::parse_uuid(0, &id)?,
            verifier,
            status,
            Self::parse_time(&created_at),
            revoked_at.as_deref().map(Self::parse_time),
        ))
    }
}

const ESCROW_COLUMNS: &str = "id, customer_account, vendor_account, customer_key, operator_key,
                              vendor_key, address, redeem_script, created_at";

impl OperatorKeyStore for SqliteStore {
    fn insert_operator_key(&self, public_key: &[u8]) -> Result<OperatorKey, StoreError> {
        let key = OperatorKey {
            id: Uuid::new_v4(),
            public_key: public_key.to_vec(),
            created_at: Utc::now(),
        };

        self.db
            .conn()
            .execute(
                "INSERT INTO operator_public_keys (id, public_key, created_at)
                 VALUES (?1, ?2, ?3)",
                params![key.id.to_string(), key.public_key, key.created_at.to_rfc3339()],
            )
            .map_err(|e| StoreError::from_write(e, "operator public key"))?;

        tracing::info!(operator_key_id = %key.id, "Operator key stored");
        Ok(key)
    }

    fn operator_keys(&self) -> Result<Vec<OperatorKey>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, public_key, created_at FROM operator_public_keys ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], Self::row_to_operator_key)?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

impl AccountKeyStore for SqliteStore {
    fn upsert_account_key(&self, account_id: &str, public_key: &[u8]) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.conn().execute(
            "INSERT INTO account_public_keys (account_id, public_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(account_id) DO UPDATE SET
                public_key = excluded.public_key,
                updated_at = excluded.updated_at",
            params![account_id, public_key, now],
        )?;

        tracing::debug!(account_id = %account_id, "Account key upserted");
        Ok(())
    }

    fn account_key(&self, account_id: &str) -> Result<Option<AccountKey>, StoreError> {
        let conn = self.db.conn();
        let key = conn
            .query_row(
                "SELECT account_id, public_key, created_at, updated_at
                 FROM account_public_keys WHERE account_id = ?1",
                params![account_id],
                Self::row_to_account_key,
            )
            .optional()?;
        Ok(key)
    }
}

impl EscrowWalletStore for SqliteStore {
    fn insert_escrow_wallet(&self, wallet: &NewEscrowWallet) -> Result<EscrowWallet, StoreError> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO escrow_wallets
                (id, customer_account, vendor_account, customer_key, operator_key,
                 vendor_key, address, redeem_script, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(address) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                wallet.customer_account,
                wallet.vendor_account,
                wallet.customer_key,
                wallet.operator_key,
                wallet.vendor_key,
                wallet.address,
                wallet.redeem_script,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let stored = conn.query_row(
            &format!("SELECT {} FROM escrow_wallets WHERE address = ?1", ESCROW_COLUMNS),
            params![wallet.address],
            Self::row_to_escrow_wallet,
        )?;

        // An address already on file is only reused by the same pair and keys.
        let same_binding = stored.customer_account == wallet.customer_account
            && stored.vendor_account == wallet.vendor_account
            && stored.customer_key == wallet.customer_key
            && stored.operator_key == wallet.operator_key
            && stored.vendor_key == wallet.vendor_key;
        if !same_binding {
            return Err(StoreError::Conflict(format!(
                "escrow address {} belongs to {} / {}",
                stored.address, stored.customer_account, stored.vendor_account
            )));
        }
        Ok(stored)
    }

    fn escrow_wallet(&self, address: &str) -> Result<Option<EscrowWallet>, StoreError> {
        let conn = self.db.conn();
        let wallet = conn
            .query_row(
                &format!("SELECT {} FROM escrow_wallets WHERE address = ?1", ESCROW_COLUMNS),
                params![address],
                Self::row_to_escrow_wallet,
            )
            .optional()?;
        Ok(wallet)
    }

    fn escrow_wallets_for_pair(
        &self,
        customer_account: &str,
        vendor_account: &str,
    ) -> Result<Vec<EscrowWallet>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM escrow_wallets
             WHERE customer_account = ?1 AND vendor_account = ?2
             ORDER BY created_at ASC",
            ESCROW_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![customer_account, vendor_account],
            Self::row_to_escrow_wallet,
        )?;

        let mut wallets = Vec::new();
        for row in rows {
            wallets.push(row?);
        }
        Ok(wallets)
    }
}

impl SimpleWalletStore for SqliteStore {
    fn simple_wallet(&self, label: &str) -> Result<Option<SimpleWallet>, StoreError> {
        let conn = self.db.conn();
        let wallet = conn
            .query_row(
                "SELECT label, address, created_at FROM simple_wallets WHERE label = ?1",
                params![label],
                Self::row_to_simple_wallet,
            )
            .optional()?;
        Ok(wallet)
    }

    fn insert_simple_wallet(&self, label: &str, address: &str) -> Result<SimpleWallet, StoreError> {
        let wallet = SimpleWallet {
            label: label.to_string(),
            address: address.to_string(),
            created_at: Utc::now(),
        };

        self.db
            .conn()
            .execute(
                "INSERT INTO simple_wallets (label, address, created_at) VALUES (?1, ?2, ?3)",
                params![wallet.label, wallet.address, wallet.created_at.to_rfc3339()],
            )
            .map_err(|e| StoreError::from_write(e, "simple wallet label"))?;
        Ok(wallet)
    }
}

impl ApiCredentialStore for SqliteStore {
    fn insert_api_credential(&self, verifier: &str) -> Result<ApiCredential, StoreError> {
        let cred = ApiCredential::new(
            Uuid::new_v4(),
            verifier.to_string(),
            CredentialStatus::Active,
            Utc::now(),
            None,
        );

        self.db
            .conn()
            .execute(
                "INSERT INTO api_credentials (id, verifier, status, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    cred.id.to_string(),
                    cred.verifier(),
                    cred.status.as_str(),
                    cred.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::from_write(e, "api credential"))?;
        Ok(cred)
    }

    fn active_api_credential(&self, verifier: &str) -> Result<Option<ApiCredential>, StoreError> {
        let conn = self.db.conn();
        let cred = conn
            .query_row(
                "SELECT id, verifier, status, created_at, revoked_at
                 FROM api_credentials WHERE verifier = ?1 AND status = 'active'",
                params![verifier],
                Self::row_to_api_credential,
            )
            .optional()?;
        Ok(cred)
    }

    fn api_credentials(&self) -> Result<Vec<ApiCredential>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, verifier, status, created_at, revoked_at
             FROM api_credentials ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_api_credential)?;

        let mut creds = Vec::new();
        for row in rows {
            creds.push(row?);
        }
        Ok(creds)
    }

    fn revoke_api_credential(&self, id: &Uuid) -> Result<bool, StoreError> {
        let affected = self.db.conn().execute(
            "UPDATE api_credentials SET status = 'revoked', revoked_at = ?2
             WHERE id = ?1 AND status = 'active'",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(affected > 0)
    }
}

impl AuditLog for SqliteStore {
    fn record(
        &self,
        subject: &str,
        action: &str,
        actor: &str,
        details: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.conn().execute(
            "INSERT INTO audit_log (subject, action, actor, timestamp, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![subject, action, actor, now, details],
        )?;

        tracing::debug!(
            subject = %subject,
            action = %action,
            actor = %actor,
            "Audit log entry recorded"
        );
        Ok(())
    }

    fn entries(&self, subject: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT subject, action, actor, timestamp, details FROM audit_log
             WHERE subject = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![subject], |row| {
            let timestamp: String = row.get(3)?;
            Ok(AuditEntry {
                subject: row.get(0)?,
                action: row.get(1)?,
                actor: row.get(2)?,
                timestamp: Self::parse_time(&timestamp),
                details: row.get(4)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
