//! Synchronization epochs.
//!
//! Every synchronization pass is stamped with one epoch, and every
//! lifecycle operation that depends on it takes the epoch as an explicit
//! argument. An entry is obsolete exactly when its `last_sync_epoch` is
//! older than the store's epoch, so obsolescence is a pure comparison and
//! tests never need the wall clock.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A synchronization epoch: milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SyncEpoch(i64);

impl SyncEpoch {
    /// The epoch of a store that has never synchronized.
    pub const ZERO: SyncEpoch = SyncEpoch(0);

    /// Creates an epoch from raw milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond value.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Captures the current wall-clock time as an epoch. Callers do this
    /// once per pass and thread the value through explicitly.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Returns the next representable epoch, for tests that need strictly
    /// increasing passes without sleeping.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}
