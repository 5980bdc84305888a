//! Error types for the store module.

use liteboard_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Content id set could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Row not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking worker or the connection lock failed.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
