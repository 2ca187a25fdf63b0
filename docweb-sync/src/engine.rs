//! The synchronization engine.
//!
//! One pass consumes a dump, reconciles every entry against the store
//! inside a single transaction, applies the hierarchy obsoletion rules
//! and advances the store epoch. The engine owns no state of its own;
//! everything observable lives in the store, which is what makes a
//! repeated pass with the same dump a no-op.

use crate::codec;
use crate::error::SyncResult;
use docweb_store::{DocStore, ObsolescenceStats};
use docweb_types::{Dump, DumpEntry, DumpRef, SyncEpoch};
use tracing::{debug, info};

/// Counts reported by one synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries seen in the dump.
    pub entries: usize,
    /// Entries created this pass.
    pub created: usize,
    /// Entries already present and refreshed.
    pub updated: usize,
    /// Outcome of the obsolescence rules.
    pub obsolescence: ObsolescenceStats,
}

/// Stateless driver for synchronization passes.
pub struct SyncEngine;

impl SyncEngine {
    /// Runs one synchronization pass over the given dump text.
    ///
    /// The whole pass is one store transaction: a malformed dump or any
    /// mid-pass failure rolls back and leaves the store untouched.
    pub fn synchronize(
        store: &DocStore,
        dump_text: &str,
        epoch: SyncEpoch,
    ) -> SyncResult<SyncReport> {
        let dump = codec::parse_dump(dump_text)?;
        Self::synchronize_dump(store, &dump, epoch)
    }

    /// Like [`SyncEngine::synchronize`], for an already-parsed dump.
    pub fn synchronize_dump(
        store: &DocStore,
        dump: &Dump,
        epoch: SyncEpoch,
    ) -> SyncResult<SyncReport> {
        store.begin()?;
        match Self::apply(store, dump, epoch) {
            Ok(report) => {
                store.commit()?;
                info!(
                    entries = report.entries,
                    created = report.created,
                    updated = report.updated,
                    files_obsoleted = report.obsolescence.files_obsoleted,
                    files_kept = report.obsolescence.files_kept,
                    epoch = epoch.as_millis(),
                    "synchronization pass complete"
                );
                Ok(report)
            }
            Err(e) => {
                // Keep the original error even if rollback itself fails.
                let _ = store.rollback();
                Err(e)
            }
        }
    }

    fn apply(store: &DocStore, dump: &Dump, epoch: SyncEpoch) -> SyncResult<SyncReport> {
        let mut report = SyncReport {
            entries: dump.len(),
            ..SyncReport::default()
        };

        for entry in dump.entries() {
            if store.get(&entry.name)?.is_some() {
                report.updated += 1;
            } else {
                report.created += 1;
            }
            store.create_or_update_from_source(entry, epoch)?;
            store.replace_aliases(&entry.name, &entry.refs)?;
        }
        debug!(
            created = report.created,
            updated = report.updated,
            "dump entries applied"
        );

        report.obsolescence = store.apply_obsolescence(epoch)?;
        store.set_epoch(epoch)?;
        store.rebuild_file_caches(epoch)?;
        Ok(report)
    }

    /// Projects the store's current (edited) view back into dump form:
    /// non-obsolete entries only, ordered by name. This is the "new
    /// dump" input for patch generation.
    pub fn current_dump(store: &DocStore) -> SyncResult<Dump> {
        let mut entries = Vec::new();
        for stored in store.non_obsolete(None)? {
            let mut entry = DumpEntry::new(stored.name.clone(), stored.kind);
            entry.type_name = stored.type_name;
            entry.arg_spec = stored.arg_spec;
            entry.owner_class = stored.owner_class;
            entry.file_path = stored.file_path;
            entry.line_number = stored.line_number;
            entry.base_types = stored.base_types;
            entry.text = store.current_text(&stored.name)?;
            entry.refs = store
                .aliases_of(&stored.name)?
                .into_iter()
                .map(|alias| DumpRef {
                    local_name: alias.local_name,
                    target: alias.target,
                    in_all: None,
                })
                .collect();
            entries.push(entry);
        }
        Ok(Dump::from_entries(entries))
    }
}
