//! Source patch projection.
//!
//! Given the last dump extracted from the pristine source tree and a
//! dump carrying the edited text, this crate locates each changed
//! entry's docstring in the original files and emits a unified diff that
//! applies the edits in place. Statement-boundary discovery is behind
//! the [`BoundaryOracle`] trait; [`TripleQuoteOracle`] is the built-in
//! implementation.

mod error;
mod oracle;
mod projector;
mod source;

pub use error::{PatchError, PatchResult};
pub use oracle::{BoundaryOracle, StatementSpan, TripleQuoteOracle};
pub use projector::{project_patch, PatchOutcome};
pub use source::SourceReader;
