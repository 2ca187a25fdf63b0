//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error (JSON-encoded columns).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored tag failed to parse back into its enum.
    #[error("invalid stored tag: {0}")]
    Tag(#[from] docweb_types::Error),

    /// Entry not found.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The entry kind rejects edits (directories have no text of their own).
    #[error("entry not editable: {0} is a directory")]
    NotEditable(String),

    /// The submitted text still contains unresolved conflict markers.
    #[error("unresolved conflict markers present in text for {0}")]
    ConflictMarkers(String),

    /// Automatic merge is blocked; the conflict must be resolved manually.
    #[error("merge conflict for {0} requires manual resolution")]
    MergeConflict(String),

    /// Invalid data in a stored row.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
