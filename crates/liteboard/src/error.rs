//! Error types for the Board.

use liteboard_core::{Action, ContentId, ContentType, UserId, ValidationError};
use liteboard_perms::PermsError;
use liteboard_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Rejected before any storage access.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Token or content lookup miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// Share token past its expiry.
    #[error("share token expired at {expires_at}")]
    Expired { expires_at: i64 },

    /// The actor lacks the required tier.
    #[error("user {user_id} may not {action} {content_type} {content_id}")]
    Forbidden {
        user_id: UserId,
        action: Action,
        content_type: ContentType,
        content_id: ContentId,
    },

    /// Grant or token persistence failed.
    #[error("storage error: {0}")]
    Storage(#[source] PermsError),

    /// A collaborator (content repository or identity directory) failed.
    #[error("content error: {0}")]
    Content(#[from] anyhow::Error),

    /// The item exists but its creator could not be granted access to it.
    #[error("{content_type} {content_id} was created but granting its creator failed: {source}")]
    GrantPropagation {
        content_type: ContentType,
        content_id: ContentId,
        #[source]
        source: PermsError,
    },
}

impl BoardError {
    /// Storage-class failures, including partially applied creations.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            BoardError::Storage(_) | BoardError::GrantPropagation { .. }
        )
    }
}

impl From<PermsError> for BoardError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::InvalidInput(v) => BoardError::InvalidInput(v),
            PermsError::NotFound(what) => BoardError::NotFound(what),
            PermsError::Expired { expires_at } => BoardError::Expired { expires_at },
            other => BoardError::Storage(other),
        }
    }
}

impl From<StoreError> for BoardError {
    fn from(e: StoreError) -> Self {
        BoardError::Storage(PermsError::Storage(e))
    }
}

/// Result type for Board operations.
pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perms_errors_keep_their_class() {
        let e: BoardError = PermsError::Expired { expires_at: 5 }.into();
        assert!(matches!(e, BoardError::Expired { expires_at: 5 }));

        let e: BoardError = PermsError::NotFound("share token".into()).into();
        assert!(matches!(e, BoardError::NotFound(_)));
        assert!(!e.is_storage());

        let e: BoardError = PermsError::Contention {
            user_id: UserId(1),
            content_type: ContentType::Project,
            attempts: 8,
        }
        .into();
        assert!(e.is_storage());

        let e: BoardError = StoreError::Task("gone".into()).into();
        assert!(e.is_storage());
    }
}
