//! Row types for the entry store.

use chrono::{DateTime, Utc};
use docweb_types::{CanonicalName, EntryKind, MergeState, ReviewState, SyncEpoch};
use serde::{Deserialize, Serialize};

/// A documentation entry as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: CanonicalName,
    pub kind: EntryKind,
    pub type_name: Option<String>,
    pub arg_spec: Option<String>,
    pub owner_class: Option<String>,
    /// Ordered base-type references (classes only).
    pub base_types: Vec<CanonicalName>,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    /// Text as last seen in the source dump.
    pub source_text: String,
    /// Merge ancestor: the source text as of the last point at which the
    /// web edits were reconciled.
    pub base_text: String,
    pub last_sync_epoch: SyncEpoch,
    pub merge_state: MergeState,
    /// Cached `current_text != source_text`; recomputed on every mutation.
    pub dirty: bool,
    pub review_state: ReviewState,
    /// Extracted page title (file kind only).
    pub title: Option<String>,
}

impl Entry {
    /// Whether this entry is excluded from the "current" view, judged
    /// against the given store epoch.
    #[must_use]
    pub fn is_obsolete(&self, store_epoch: SyncEpoch) -> bool {
        self.last_sync_epoch < store_epoch
    }
}

/// An immutable snapshot of an entry's text at one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Monotonic per store; the highest sequence number is the current
    /// text.
    pub seq: i64,
    pub entry_name: CanonicalName,
    pub text: String,
    pub author: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub review_state: ReviewState,
    /// Marked OK to project into a source patch.
    pub approved: bool,
}

/// A directed labeled edge `(parent, local_name) -> target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub parent: CanonicalName,
    pub local_name: String,
    pub target: CanonicalName,
}

/// A discussion note attached to an entry (optionally to one revision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub entry_name: CanonicalName,
    pub revision_seq: Option<i64>,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}
