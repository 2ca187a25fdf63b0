//! Error types for the synchronization layer.

use crate::codec::CodecError;
use docweb_store::StoreError;
use thiserror::Error;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The dump could not be parsed; the whole pass is rolled back.
    #[error("malformed dump: {0}")]
    Malformed(#[from] CodecError),

    /// A store operation failed mid-pass.
    #[error(transparent)]
    Store(#[from] StoreError),
}
