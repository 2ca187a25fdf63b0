//! Closed enums for entry kind, merge state and review state.
//!
//! Kinds drive the per-kind lifecycle branches (directory/file entries
//! obey hierarchy rules, directories are not editable); keeping them as a
//! closed enum keeps those branches in one `match` instead of scattered
//! string comparisons.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a documentation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Module,
    Class,
    Callable,
    Object,
    /// A directory node in the path-like namespace.
    #[serde(rename = "dir")]
    Directory,
    /// A document file in the path-like namespace.
    File,
}

impl EntryKind {
    /// All kinds, in dump-element order.
    pub const ALL: [EntryKind; 6] = [
        EntryKind::Module,
        EntryKind::Class,
        EntryKind::Callable,
        EntryKind::Object,
        EntryKind::Directory,
        EntryKind::File,
    ];

    /// The tag used in the dump format and in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Module => "module",
            EntryKind::Class => "class",
            EntryKind::Callable => "callable",
            EntryKind::Object => "object",
            EntryKind::Directory => "dir",
            EntryKind::File => "file",
        }
    }

    /// Directory and file entries live in the tree-shaped namespace and
    /// follow the hierarchy obsoletion/resurrection rules.
    #[must_use]
    pub const fn is_hierarchical(&self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::File)
    }

    /// Directory entries have no text of their own and reject edits.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !matches!(self, EntryKind::Directory)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(EntryKind::Module),
            "class" => Ok(EntryKind::Class),
            "callable" => Ok(EntryKind::Callable),
            "object" => Ok(EntryKind::Object),
            "dir" => Ok(EntryKind::Directory),
            "file" => Ok(EntryKind::File),
            other => Err(Error::InvalidKind(other.to_string())),
        }
    }
}

/// Reconciliation status of an entry against its upstream source text.
///
/// `Conflict` is a first-class state, not an error: it blocks automatic
/// merging but not display or manual editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    #[default]
    None,
    Mergeable,
    Conflict,
}

impl MergeState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MergeState::None => "none",
            MergeState::Mergeable => "merge",
            MergeState::Conflict => "conflict",
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MergeState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MergeState::None),
            "merge" => Ok(MergeState::Mergeable),
            "conflict" => Ok(MergeState::Conflict),
            other => Err(Error::InvalidMergeState(other.to_string())),
        }
    }
}

/// Editorial progress of an entry, ordered from raw to done.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    NeedsEditing,
    BeingWritten,
    NeedsReview,
    Revised,
    Reviewed,
    Proofed,
}

impl ReviewState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReviewState::NeedsEditing => "needs_editing",
            ReviewState::BeingWritten => "being_written",
            ReviewState::NeedsReview => "needs_review",
            ReviewState::Revised => "revised",
            ReviewState::Reviewed => "reviewed",
            ReviewState::Proofed => "proofed",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_editing" => Ok(ReviewState::NeedsEditing),
            "being_written" => Ok(ReviewState::BeingWritten),
            "needs_review" => Ok(ReviewState::NeedsReview),
            "revised" => Ok(ReviewState::Revised),
            "reviewed" => Ok(ReviewState::Reviewed),
            "proofed" => Ok(ReviewState::Proofed),
            other => Err(Error::InvalidReviewState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip() {
        for kind in EntryKind::ALL {
            assert_eq!(kind.as_str().parse::<EntryKind>().unwrap(), kind);
        }
    }

    #[test]
    fn directory_is_not_editable() {
        assert!(!EntryKind::Directory.is_editable());
        assert!(EntryKind::File.is_editable());
        assert!(EntryKind::Directory.is_hierarchical());
        assert!(!EntryKind::Callable.is_hierarchical());
    }

    #[test]
    fn review_states_are_ordered() {
        assert!(ReviewState::NeedsEditing < ReviewState::NeedsReview);
        assert!(ReviewState::Reviewed < ReviewState::Proofed);
    }
}
