//! Text merge algorithms for docweb.
//!
//! This crate provides the pure text machinery the engine is built on:
//!
//! - [`normalize`] — whitespace normalization applied to every text blob
//! - [`diff_lines`] — Myers shortest-edit-script line diff
//! - [`merge3`] — diff3-style three-way merge with conflict markers
//! - [`unified_diff`] — unified-diff rendering for patch output
//!
//! Everything here is a pure function of its inputs: no store access, no
//! clock. Re-running a merge with the same three texts always reproduces
//! the same result, which is what makes repeated synchronization
//! idempotent.

mod diff;
mod diff3;
mod normalize;
mod unified;

pub use diff::{diff_lines, Hunk};
pub use diff3::{contains_conflict_markers, merge3, MergeOutcome};
pub use normalize::{normalize, split_lines};
pub use unified::unified_diff;
