//! SQLite-backed entry store for docweb.
//!
//! Persists the documentation entry graph: entries keyed by canonical
//! name, their revision history, alias edges, discussion comments and the
//! derived read-path caches (cross-reference labels, toctree children).
//!
//! # Architecture
//!
//! - [`DocStore`] owns the connection and implements the lifecycle
//!   operations: source-driven upserts, user edits, merge bookkeeping and
//!   the hierarchy obsoletion/resurrection rules.
//! - [`NameGraph`] is a pure in-memory view (node map + labeled edges)
//!   used for non-canonical name resolution; the store builds it on
//!   demand from the entries and alias tables.
//! - Obsolescence is a comparison against the store epoch, which only
//!   advances when a synchronization pass completes.

mod entry;
mod error;
mod graph;
mod rst;
mod store;

pub use entry::{Alias, Comment, Entry, Revision};
pub use error::{StoreError, StoreResult};
pub use graph::NameGraph;
pub use rst::{extract_title, labels, toctree_children};
pub use store::{DocStore, ObsolescenceStats};
