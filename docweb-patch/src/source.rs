//! Path-traversal-safe access to the original source tree.

use crate::error::{PatchError, PatchResult};
use std::path::{Component, Path, PathBuf};

/// Reads files beneath a fixed root directory. Dump metadata is
/// externally produced, so every path it names is treated as untrusted.
#[derive(Debug, Clone)]
pub struct SourceReader {
    root: PathBuf,
}

impl SourceReader {
    /// Creates a reader rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads a file by its root-relative path.
    pub fn read(&self, relative: &str) -> PatchResult<String> {
        let path = Path::new(relative);
        let safe = path.components().all(|c| matches!(c, Component::Normal(_)));
        if path.is_absolute() || !safe {
            return Err(PatchError::PathOutsideRoot(path.to_path_buf()));
        }
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|source| PatchError::Io {
            path: full,
            source,
        })
    }
}
