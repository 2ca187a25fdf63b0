//! Dump codec and synchronization engine.
//!
//! The extraction job hands this crate a dump of source-derived
//! documentation entries; one [`SyncEngine`] pass reconciles the dump
//! against the [`DocStore`](docweb_store::DocStore), stamping every
//! operation with one explicit [`SyncEpoch`](docweb_types::SyncEpoch).

pub mod codec;
mod engine;
mod error;

pub use codec::CodecError;
pub use engine::{SyncEngine, SyncReport};
pub use error::{SyncError, SyncResult};
