// error.rs — Error types for goal records and the goal store.

use thiserror::Error;

/// Errors that can occur while reading or writing goal records.
#[derive(Debug, Error)]
pub enum GoalError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// The store as a whole cannot be reached (missing directory, unreadable
    /// listing). Fatal to an enrichment run when hit at scan time.
    #[error("goal store unavailable at {path}: {reason}")]
    StoreUnavailable { path: String, reason: String },

    /// A single stored record could not be decoded.
    #[error("invalid goal record at {path}: {source}")]
    InvalidRecord {
        path: String,
        source: serde_json::Error,
    },

    /// Failed to serialize goal data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The identifier cannot name a record in this store.
    #[error("invalid goal id: {0:?}")]
    InvalidGoalId(String),
}
