//! Error types for patch projection.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;

/// Errors that can occur reading source files for patch projection.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The requested path is absolute or climbs out of the source root.
    #[error("path escapes the source root: {0}")]
    PathOutsideRoot(PathBuf),

    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
