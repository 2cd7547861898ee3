//! Error types for the core domain types.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding persisted domain records.
#[derive(Error, Debug)]
pub enum Error {
    /// A stored record could not be decoded.
    #[error("corrupt record '{key}': {reason}")]
    CorruptRecord {
        /// Store key of the record.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A route segment contained characters outside the slug alphabet.
    #[error("invalid route segment '{0}'")]
    InvalidSegment(String),

    /// JSON encoding/decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
