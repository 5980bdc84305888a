//! Error types for Liteboard Core.

use thiserror::Error;

/// Errors raised while encoding or decoding core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Input rejected before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown action: {0:?}")]
    UnknownAction(String),

    #[error("unknown content type: {0:?}")]
    UnknownContentType(String),

    #[error("invalid share level: {0:?} (only read and write can be shared by token)")]
    InvalidShareLevel(String),

    #[error("{field} must be positive, got {value}")]
    NonPositiveId { field: &'static str, value: i64 },

    #[error("invalid token lifetime: {0} hours")]
    InvalidLifetime(i64),

    #[error("content type {0} cannot be created through the board")]
    NotCreatable(String),

    #[error("content body must be a JSON object")]
    BodyNotObject,
}
