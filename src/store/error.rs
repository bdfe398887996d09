// Plutus — Store error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    #[error("Row already exists: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Translate constraint violations into `Conflict`, leaving other
    /// database errors untouched.
    pub(crate) fn from_write(err: rusqlite::Error, what: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(what.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}
