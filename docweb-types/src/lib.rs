//! Core type definitions for docweb.
//!
//! This crate defines the fundamental, storage-agnostic types used
//! throughout the documentation engine:
//! - Canonical names and their hierarchical component structure
//! - Entry kind / merge state / review state enums
//! - Synchronization epochs (explicit, never a global clock)
//! - The parsed dump data model exchanged with the extraction job
//!
//! Rendering-specific types (HTML, page templates, search records) belong
//! in their respective consumers, not here.

mod dump;
mod epoch;
mod kind;
mod name;

pub use dump::{Dump, DumpEntry, DumpRef};
pub use epoch::SyncEpoch;
pub use kind::{EntryKind, MergeState, ReviewState};
pub use name::CanonicalName;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown entry kind tag: {0}")]
    InvalidKind(String),

    #[error("unknown merge state tag: {0}")]
    InvalidMergeState(String),

    #[error("unknown review state tag: {0}")]
    InvalidReviewState(String),
}
