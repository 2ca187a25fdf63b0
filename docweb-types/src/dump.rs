//! The parsed dump data model.
//!
//! A dump is the structured extraction of documentation entries produced
//! by the external source-crawling step: a flat sequence of entries, each
//! tagged with its kind, canonical id, optional source metadata, raw text
//! and outgoing references. The sync engine consumes dumps; the patch
//! projector compares two of them.

use crate::{CanonicalName, EntryKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named reference (alias edge) from a dump entry to another entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpRef {
    /// The name the parent uses for the child (attribute name, file name).
    pub local_name: String,
    /// Canonical name of the referenced entry.
    pub target: CanonicalName,
    /// Whether the name appears in the module's `__all__`-style export
    /// list, when the extractor records that.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_all: Option<bool>,
}

/// One documentation entry as extracted from the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpEntry {
    pub name: CanonicalName,
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// Ordered base-type references (classes only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_types: Vec<CanonicalName>,
    /// Docstring / document content, decoded to native text.
    #[serde(default)]
    pub text: String,
    /// Outgoing alias edges, replacing the entry's alias list wholesale
    /// on synchronization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<DumpRef>,
}

impl DumpEntry {
    /// Creates a bare entry with the given identity; metadata defaults to
    /// empty. Convenient for tests and for dump construction.
    pub fn new(name: impl Into<CanonicalName>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: None,
            arg_spec: None,
            owner_class: None,
            file_path: None,
            line_number: None,
            base_types: Vec::new(),
            text: String::new(),
            refs: Vec::new(),
        }
    }

    /// Builder-style text assignment.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder-style source location assignment.
    #[must_use]
    pub fn with_location(mut self, file_path: impl Into<String>, line_number: u32) -> Self {
        self.file_path = Some(file_path.into());
        self.line_number = Some(line_number);
        self
    }
}

/// An ordered collection of dump entries with a name index.
#[derive(Debug, Clone, Default)]
pub struct Dump {
    entries: Vec<DumpEntry>,
    index: BTreeMap<CanonicalName, usize>,
}

impl PartialEq for Dump {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Dump {}

impl Dump {
    /// Creates an empty dump.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dump from a list of entries. Later duplicates of the same
    /// canonical name shadow earlier ones in the index.
    #[must_use]
    pub fn from_entries(entries: Vec<DumpEntry>) -> Self {
        let mut dump = Self {
            entries,
            index: BTreeMap::new(),
        };
        dump.reindex();
        dump
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: DumpEntry) {
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Looks up an entry by canonical name.
    #[must_use]
    pub fn get(&self, name: &CanonicalName) -> Option<&DumpEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &DumpEntry> {
        self.entries.iter()
    }

    /// Canonical names in sorted order (deterministic iteration for
    /// patch generation).
    pub fn names(&self) -> impl Iterator<Item = &CanonicalName> {
        self.index.keys()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the dump holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_tracks_entries() {
        let mut dump = Dump::new();
        dump.push(DumpEntry::new("a.b", EntryKind::Module).with_text("x"));
        dump.push(DumpEntry::new("a.b.c", EntryKind::Callable));

        assert_eq!(dump.len(), 2);
        assert_eq!(dump.get(&"a.b".into()).unwrap().text, "x");
        let names: Vec<_> = dump.names().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["a.b", "a.b.c"]);
    }
}
