// Plutus — SQLite Database Management
//
// Opens the gateway database and runs the schema migrations. A single
// connection is shared behind a mutex; every repository call holds the
// lock only for the duration of its own statements, which gives the
// per-row atomicity the custody components rely on.

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::StoreError;

/// Wrapper around the SQLite connection used by every repository.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Other(format!("cannot create {}: {}", parent.display(), e)))?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;

        tracing::debug!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Open an in-memory database (for testing only).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Lock and return the underlying connection.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run schema migrations to create or update tables.
    fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS operator_public_keys (
                id              TEXT PRIMARY KEY,
                public_key      BLOB NOT NULL UNIQUE,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS account_public_keys (
                account_id      TEXT PRIMARY KEY,
                public_key      BLOB NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS escrow_wallets (
                id                  TEXT PRIMARY KEY,
                customer_account    TEXT NOT NULL,
                vendor_account      TEXT NOT NULL,
                customer_key        BLOB NOT NULL,
                operator_key        BLOB NOT NULL,
                vendor_key          BLOB NOT NULL,
                address             TEXT NOT NULL UNIQUE,
                redeem_script       TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS simple_wallets (
                label           TEXT PRIMARY KEY,
                address         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS api_credentials (
                id              TEXT PRIMARY KEY,
                verifier        TEXT NOT NULL UNIQUE,
                status          TEXT NOT NULL DEFAULT 'active',
                created_at      TEXT NOT NULL,
                revoked_at      TEXT
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                subject         TEXT NOT NULL,
                action          TEXT NOT NULL,
                actor           TEXT NOT NULL,
                timestamp       TEXT NOT NULL,
                details         TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_subject
                ON audit_log(subject);

            CREATE INDEX IF NOT EXISTS idx_escrow_pair
                ON escrow_wallets(customer_account, vendor_account);
            ",
        )?;

        tracing::debug!("Database migrations completed successfully");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
