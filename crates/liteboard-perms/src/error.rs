//! Error types for the permissions module.

use liteboard_core::{ContentType, UserId, ValidationError};
use liteboard_store::StoreError;
use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Rejected before any storage access.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Token lookup miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// Share token past its expiry.
    #[error("share token expired at {expires_at}")]
    Expired { expires_at: i64 },

    /// Underlying persistence failure, surfaced unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Optimistic retries ran out.
    #[error("grants for user {user_id} on {content_type} still contended after {attempts} attempts")]
    Contention {
        user_id: UserId,
        content_type: ContentType,
        attempts: u32,
    },

    /// The OS random source failed.
    #[error("token generation failed: {0}")]
    TokenGeneration(String),
}

impl PermsError {
    /// Storage-class failures: persistence errors and exhausted retries.
    pub fn is_storage(&self) -> bool {
        matches!(self, PermsError::Storage(_) | PermsError::Contention { .. })
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
