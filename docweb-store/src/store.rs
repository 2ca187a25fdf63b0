//! The persisted entry store and its lifecycle operations.

use crate::entry::{Alias, Comment, Entry, Revision};
use crate::error::{StoreError, StoreResult};
use crate::graph::NameGraph;
use crate::rst;
use chrono::{DateTime, Utc};
use docweb_merge::{contains_conflict_markers, merge3, normalize};
use docweb_types::{CanonicalName, DumpEntry, DumpRef, EntryKind, MergeState, ReviewState, SyncEpoch};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Author recorded on the synthetic initial revision that preserves the
/// original source text as the history baseline.
const SOURCE_AUTHOR: &str = "Source";

/// Counts reported by one obsolescence pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObsolescenceStats {
    /// File entries that dropped out of the current view.
    pub files_obsoleted: usize,
    /// File entries kept alive because local edits survive an upstream
    /// deletion.
    pub files_kept: usize,
    /// Directory entries kept for their surviving descendants.
    pub dirs_kept: usize,
    /// Directory entries that dropped out of the current view.
    pub dirs_obsoleted: usize,
    /// Empty directory entries hard-deleted with their last descendant.
    pub dirs_deleted: usize,
}

/// Persistent store for the documentation entry graph, backed by SQLite.
pub struct DocStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                name TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                type_name TEXT,
                arg_spec TEXT,
                owner_class TEXT,
                base_types TEXT NOT NULL DEFAULT '[]',
                file_path TEXT,
                line_number INTEGER,
                source_text TEXT NOT NULL DEFAULT '',
                base_text TEXT NOT NULL DEFAULT '',
                last_sync_epoch INTEGER NOT NULL DEFAULT 0,
                merge_state TEXT NOT NULL DEFAULT 'none',
                dirty INTEGER NOT NULL DEFAULT 0,
                review_state TEXT NOT NULL DEFAULT 'needs_editing',
                title TEXT
            );

            CREATE TABLE IF NOT EXISTS revisions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                entry_name TEXT NOT NULL REFERENCES entries(name) ON DELETE CASCADE,
                text TEXT NOT NULL,
                author TEXT NOT NULL,
                comment TEXT NOT NULL,
                created_at TEXT NOT NULL,
                review_state TEXT NOT NULL DEFAULT 'needs_editing',
                approved INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_revisions_entry
                ON revisions(entry_name, seq);

            CREATE TABLE IF NOT EXISTS aliases (
                parent TEXT NOT NULL,
                local_name TEXT NOT NULL,
                target TEXT NOT NULL,
                UNIQUE(parent, local_name)
            );
            CREATE INDEX IF NOT EXISTS idx_aliases_target ON aliases(target);

            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entry_name TEXT NOT NULL REFERENCES entries(name) ON DELETE CASCADE,
                revision_seq INTEGER,
                author TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                resolved INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS label_cache (
                label TEXT NOT NULL,
                entry_name TEXT NOT NULL REFERENCES entries(name) ON DELETE CASCADE,
                title TEXT,
                UNIQUE(label, entry_name)
            );

            CREATE TABLE IF NOT EXISTS toc_cache (
                parent_name TEXT NOT NULL REFERENCES entries(name) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                child_name TEXT NOT NULL,
                UNIQUE(parent_name, position)
            );
            ",
        )?;
        Ok(())
    }

    // ── Transactions ─────────────────────────────────────────────

    /// Begins a store-wide transaction. The sync engine wraps a whole
    /// pass so a malformed dump never leaves partial writes behind.
    pub fn begin(&self) -> StoreResult<()> {
        self.conn.lock().unwrap().execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    /// Commits the open transaction.
    pub fn commit(&self) -> StoreResult<()> {
        self.conn.lock().unwrap().execute_batch("COMMIT")?;
        Ok(())
    }

    /// Rolls back the open transaction.
    pub fn rollback(&self) -> StoreResult<()> {
        self.conn.lock().unwrap().execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ── Epoch ────────────────────────────────────────────────────

    /// The epoch of the last completed synchronization pass.
    pub fn epoch(&self) -> StoreResult<SyncEpoch> {
        let conn = self.conn.lock().unwrap();
        Self::epoch_inner(&conn)
    }

    /// Advances the store epoch; called once per completed pass.
    pub fn set_epoch(&self, epoch: SyncEpoch) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO meta (key, value) VALUES ('epoch', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![epoch.as_millis().to_string()],
        )?;
        Ok(())
    }

    fn epoch_inner(conn: &Connection) -> StoreResult<SyncEpoch> {
        let value: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'epoch'", [], |row| {
                row.get(0)
            })
            .optional()?;
        match value {
            Some(v) => {
                let millis = v
                    .parse::<i64>()
                    .map_err(|e| StoreError::InvalidData(format!("bad epoch value: {e}")))?;
                Ok(SyncEpoch::from_millis(millis))
            }
            None => Ok(SyncEpoch::ZERO),
        }
    }

    // ── Lookup ───────────────────────────────────────────────────

    /// Fetches an entry by canonical name.
    pub fn get(&self, name: &CanonicalName) -> StoreResult<Option<Entry>> {
        let conn = self.conn.lock().unwrap();
        Self::get_inner(&conn, name)
    }

    /// Fetches an entry, failing with `NotFound` when absent.
    pub fn entry(&self, name: &CanonicalName) -> StoreResult<Entry> {
        self.get(name)?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// The entry's current text: its latest revision, or the source text
    /// when no revisions exist.
    pub fn current_text(&self, name: &CanonicalName) -> StoreResult<String> {
        let conn = self.conn.lock().unwrap();
        let entry =
            Self::get_inner(&conn, name)?.ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Self::current_text_inner(&conn, name, &entry.source_text)
    }

    /// Whether the entry is excluded from the current view.
    pub fn is_obsolete(&self, name: &CanonicalName) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let entry =
            Self::get_inner(&conn, name)?.ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(entry.is_obsolete(Self::epoch_inner(&conn)?))
    }

    /// All non-obsolete entries, optionally restricted to one kind,
    /// ordered by name.
    pub fn non_obsolete(&self, kind: Option<EntryKind>) -> StoreResult<Vec<Entry>> {
        let conn = self.conn.lock().unwrap();
        let epoch = Self::epoch_inner(&conn)?;
        let mut out = Vec::new();
        match kind {
            Some(kind) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM entries
                     WHERE kind = ?1 AND last_sync_epoch >= ?2 ORDER BY name",
                )?;
                let rows = stmt.query_map(
                    params![kind.as_str(), epoch.as_millis()],
                    Self::entry_row_raw,
                )?;
                for row in rows {
                    out.push(Self::entry_from_raw(row?)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM entries WHERE last_sync_epoch >= ?1 ORDER BY name",
                )?;
                let rows = stmt.query_map(params![epoch.as_millis()], Self::entry_row_raw)?;
                for row in rows {
                    out.push(Self::entry_from_raw(row?)?);
                }
            }
        }
        Ok(out)
    }

    /// Resolves a possibly non-canonical name to its entry.
    pub fn resolve(&self, query: &str) -> StoreResult<Option<Entry>> {
        let graph = self.name_graph()?;
        match graph.resolve(query) {
            Some(name) => self.get(&name),
            None => Ok(None),
        }
    }

    /// Builds the pure resolution graph from the entries and alias
    /// tables.
    pub fn name_graph(&self) -> StoreResult<NameGraph> {
        let conn = self.conn.lock().unwrap();
        let mut graph = NameGraph::new();

        let mut stmt = conn.prepare("SELECT name FROM entries")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for name in names {
            graph.add_node(CanonicalName::new(name?));
        }

        let mut stmt = conn.prepare("SELECT parent, local_name, target FROM aliases")?;
        let edges = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for edge in edges {
            let (parent, local, target) = edge?;
            graph.add_edge(CanonicalName::new(parent), local, CanonicalName::new(target));
        }

        Ok(graph)
    }

    // ── Source-driven upsert ─────────────────────────────────────

    /// Get-or-create from a dump entry, stamped with the pass epoch.
    ///
    /// On create the text becomes both source and merge base. On update
    /// the source text moves and the merge check runs; current text is
    /// never mutated here (merge results are computed on demand).
    pub fn create_or_update_from_source(
        &self,
        incoming: &DumpEntry,
        epoch: SyncEpoch,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let text = normalize(&incoming.text);
        let base_types = serde_json::to_string(&incoming.base_types)?;

        match Self::get_inner(&conn, &incoming.name)? {
            None => {
                debug!(name = %incoming.name, kind = %incoming.kind, "creating entry from source");
                let title = match incoming.kind {
                    EntryKind::File => rst::extract_title(&text),
                    _ => None,
                };
                conn.execute(
                    "INSERT INTO entries
                        (name, kind, type_name, arg_spec, owner_class, base_types,
                         file_path, line_number, source_text, base_text,
                         last_sync_epoch, merge_state, dirty, review_state, title)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, 'none', 0,
                             'needs_editing', ?11)",
                    params![
                        incoming.name.as_str(),
                        incoming.kind.as_str(),
                        incoming.type_name,
                        incoming.arg_spec,
                        incoming.owner_class,
                        base_types,
                        incoming.file_path,
                        incoming.line_number,
                        text,
                        epoch.as_millis(),
                        title,
                    ],
                )?;
            }
            Some(existing) => {
                conn.execute(
                    "UPDATE entries SET kind = ?2, type_name = ?3, arg_spec = ?4,
                         owner_class = ?5, base_types = ?6, file_path = ?7,
                         line_number = ?8, last_sync_epoch = ?9
                     WHERE name = ?1",
                    params![
                        incoming.name.as_str(),
                        incoming.kind.as_str(),
                        incoming.type_name,
                        incoming.arg_spec,
                        incoming.owner_class,
                        base_types,
                        incoming.file_path,
                        incoming.line_number,
                        epoch.as_millis(),
                    ],
                )?;
                if text != existing.source_text {
                    debug!(name = %incoming.name, "source text moved, running merge check");
                    conn.execute(
                        "UPDATE entries SET source_text = ?2 WHERE name = ?1",
                        params![incoming.name.as_str(), text],
                    )?;
                }
                // Self-healing merge check: resets stale merge state or
                // recomputes mergeable/conflict against the new source.
                Self::get_merge_inner(&conn, &incoming.name)?;
                Self::refresh_dirty_inner(&conn, &incoming.name)?;
            }
        }
        Ok(())
    }

    /// Replaces the entry's outgoing alias edges wholesale.
    pub fn replace_aliases(&self, name: &CanonicalName, refs: &[DumpRef]) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM aliases WHERE parent = ?1", params![name.as_str()])?;
        for r in refs {
            conn.execute(
                "INSERT OR REPLACE INTO aliases (parent, local_name, target)
                 VALUES (?1, ?2, ?3)",
                params![name.as_str(), r.local_name, r.target.as_str()],
            )?;
        }
        Ok(())
    }

    /// Outgoing alias edges of an entry, ordered by local name.
    pub fn aliases_of(&self, parent: &CanonicalName) -> StoreResult<Vec<Alias>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT parent, local_name, target FROM aliases
             WHERE parent = ?1 ORDER BY local_name",
        )?;
        let rows = stmt.query_map(params![parent.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (parent, local_name, target) = row?;
            out.push(Alias {
                parent: CanonicalName::new(parent),
                local_name,
                target: CanonicalName::new(target),
            });
        }
        Ok(out)
    }

    // ── Editing ──────────────────────────────────────────────────

    /// Applies a user edit: appends a revision, resets merge
    /// bookkeeping, and runs the file-kind lifecycle rules
    /// (resurrection, hiding).
    pub fn edit(
        &self,
        name: &CanonicalName,
        new_text: &str,
        author: &str,
        comment: &str,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        Self::edit_inner(&conn, name, new_text, author, comment)
    }

    fn edit_inner(
        conn: &Connection,
        name: &CanonicalName,
        new_text: &str,
        author: &str,
        comment: &str,
    ) -> StoreResult<()> {
        let entry =
            Self::get_inner(conn, name)?.ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if !entry.kind.is_editable() {
            return Err(StoreError::NotEditable(name.to_string()));
        }
        if contains_conflict_markers(new_text) {
            return Err(StoreError::ConflictMarkers(name.to_string()));
        }

        let text = normalize(new_text);
        let current = Self::current_text_inner(conn, name, &entry.source_text)?;
        let store_epoch = Self::epoch_inner(conn)?;

        if entry.kind == EntryKind::File {
            if entry.is_obsolete(store_epoch) && !text.is_empty() {
                info!(name = %name, "resurrecting obsolete file entry");
                Self::resurrect_inner(conn, name, store_epoch)?;
            }
            if text.is_empty() && !current.is_empty() {
                // The text became empty: hidden from hierarchy listings,
                // though the row persists. Re-saving an already-empty
                // page is not a transition and leaves its links alone.
                conn.execute("DELETE FROM aliases WHERE target = ?1", params![name.as_str()])?;
            }
        }

        // Any outstanding merge is considered resolved by this edit.
        conn.execute(
            "UPDATE entries SET merge_state = 'none', base_text = source_text WHERE name = ?1",
            params![name.as_str()],
        )?;

        if text != current {
            if Self::revision_count_inner(conn, name)? == 0 {
                Self::insert_revision_inner(
                    conn,
                    name,
                    &entry.source_text,
                    SOURCE_AUTHOR,
                    "Initial source revision",
                    entry.review_state,
                )?;
            }
            Self::insert_revision_inner(conn, name, &text, author, comment, entry.review_state)?;
            debug!(name = %name, author = author, "edit recorded");
        }

        Self::refresh_dirty_inner(conn, name)?;
        if entry.kind == EntryKind::File {
            Self::rebuild_entry_caches_inner(conn, name)?;
        }
        Ok(())
    }

    // ── Merging ──────────────────────────────────────────────────

    /// Computes the three-way merge of the entry's current text against
    /// the moved source text.
    ///
    /// Returns `None` when there is nothing to reconcile; each such case
    /// also resets the merge bookkeeping, which is how stale merge state
    /// self-heals. Otherwise returns the merge result and records
    /// mergeable/conflict without touching the current text.
    pub fn get_merge(&self, name: &CanonicalName) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Self::get_merge_inner(&conn, name)
    }

    fn get_merge_inner(conn: &Connection, name: &CanonicalName) -> StoreResult<Option<String>> {
        let entry =
            Self::get_inner(conn, name)?.ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let current = Self::current_text_inner(conn, name, &entry.source_text)?;
        let revisions = Self::revision_count_inner(conn, name)?;

        if entry.base_text == entry.source_text || revisions == 0 || current == entry.source_text {
            conn.execute(
                "UPDATE entries SET merge_state = 'none', base_text = source_text WHERE name = ?1",
                params![name.as_str()],
            )?;
            return Ok(None);
        }

        let outcome = merge3(&current, &entry.base_text, &entry.source_text);
        let state = if outcome.has_conflict {
            MergeState::Conflict
        } else {
            MergeState::Mergeable
        };
        conn.execute(
            "UPDATE entries SET merge_state = ?2 WHERE name = ?1",
            params![name.as_str(), state.as_str()],
        )?;
        debug!(name = %name, state = %state, "merge computed");
        Ok(Some(outcome.text))
    }

    /// Commits a clean merge as an edit authored by `author`.
    ///
    /// Conflicts must be resolved manually and fail with
    /// `MergeConflict`. When nothing is pending this is a no-op, which
    /// makes repeated invocation idempotent.
    pub fn automatic_merge(&self, name: &CanonicalName, author: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let merged = Self::get_merge_inner(&conn, name)?;
        match merged {
            None => Ok(()),
            Some(text) => {
                let entry = Self::get_inner(&conn, name)?
                    .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
                if entry.merge_state == MergeState::Conflict {
                    return Err(StoreError::MergeConflict(name.to_string()));
                }
                Self::edit_inner(&conn, name, &text, author, "Merged")
            }
        }
    }

    // ── Obsolescence & resurrection ──────────────────────────────

    /// Applies the hierarchy obsoletion rules for a completed pass:
    /// files first, then directories deepest-first.
    pub fn apply_obsolescence(&self, epoch: SyncEpoch) -> StoreResult<ObsolescenceStats> {
        let conn = self.conn.lock().unwrap();
        let mut stats = ObsolescenceStats::default();

        // Files: locally-edited non-empty entries survive an upstream
        // deletion; the merge check turns the deletion into a conflict
        // instead of silently dropping the edits.
        for entry in Self::kind_candidates_inner(&conn, EntryKind::File, epoch)? {
            let current = Self::current_text_inner(&conn, &entry.name, &entry.source_text)?;
            if current != entry.base_text && !current.is_empty() {
                conn.execute(
                    "UPDATE entries SET source_text = '', last_sync_epoch = ?2 WHERE name = ?1",
                    params![entry.name.as_str(), epoch.as_millis()],
                )?;
                Self::get_merge_inner(&conn, &entry.name)?;
                Self::refresh_dirty_inner(&conn, &entry.name)?;
                stats.files_kept += 1;
            } else {
                stats.files_obsoleted += 1;
            }
        }

        // Directories, deepest first so kept children are visible to
        // their parents as survivors.
        let mut dirs = Self::kind_candidates_inner(&conn, EntryKind::Directory, epoch)?;
        dirs.sort_by_key(|e| std::cmp::Reverse(e.name.components().len()));
        for dir in dirs {
            let survivors = Self::descendants_at_epoch_inner(&conn, &dir.name, epoch)?;
            if survivors.is_empty() {
                let current = Self::current_text_inner(&conn, &dir.name, &dir.source_text)?;
                if current.is_empty() {
                    Self::delete_entry_inner(&conn, &dir.name)?;
                    stats.dirs_deleted += 1;
                } else {
                    stats.dirs_obsoleted += 1;
                }
            } else {
                conn.execute(
                    "UPDATE entries SET last_sync_epoch = ?2 WHERE name = ?1",
                    params![dir.name.as_str(), epoch.as_millis()],
                )?;
                Self::link_deduced_children_inner(&conn, &dir.name, &survivors, epoch)?;
                stats.dirs_kept += 1;
            }
        }

        info!(
            files_obsoleted = stats.files_obsoleted,
            files_kept = stats.files_kept,
            dirs_kept = stats.dirs_kept,
            dirs_deleted = stats.dirs_deleted,
            "obsolescence pass complete"
        );
        Ok(stats)
    }

    /// Creates a file-kind entry (and its ancestor directories) outside
    /// of synchronization, e.g. for a brand-new wiki page, stamped with
    /// the given epoch.
    pub fn ensure_file(&self, name: &CanonicalName, epoch: SyncEpoch) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        if Self::get_inner(&conn, name)?.is_none() {
            conn.execute(
                "INSERT INTO entries (name, kind, last_sync_epoch) VALUES (?1, 'file', ?2)",
                params![name.as_str(), epoch.as_millis()],
            )?;
        }
        Self::resurrect_inner(&conn, name, epoch)
    }

    /// Bumps the entry to the store epoch and splices it back into its
    /// parent's alias list, creating or resurrecting ancestor
    /// directories as needed.
    fn resurrect_inner(
        conn: &Connection,
        name: &CanonicalName,
        epoch: SyncEpoch,
    ) -> StoreResult<()> {
        conn.execute(
            "UPDATE entries SET last_sync_epoch = ?2 WHERE name = ?1",
            params![name.as_str(), epoch.as_millis()],
        )?;

        let mut child = name.clone();
        while let Some(parent) = child.parent() {
            let existing = Self::get_inner(conn, &parent)?;
            let was_live = existing
                .as_ref()
                .map(|e| !e.is_obsolete(epoch))
                .unwrap_or(false);
            match existing {
                None => {
                    conn.execute(
                        "INSERT INTO entries (name, kind, last_sync_epoch) VALUES (?1, 'dir', ?2)",
                        params![parent.as_str(), epoch.as_millis()],
                    )?;
                }
                Some(_) => {
                    conn.execute(
                        "UPDATE entries SET last_sync_epoch = ?2 WHERE name = ?1",
                        params![parent.as_str(), epoch.as_millis()],
                    )?;
                }
            }
            conn.execute(
                "INSERT OR REPLACE INTO aliases (parent, local_name, target) VALUES (?1, ?2, ?3)",
                params![parent.as_str(), child.leaf(), child.as_str()],
            )?;
            if was_live {
                break;
            }
            child = parent;
        }
        Ok(())
    }

    fn kind_candidates_inner(
        conn: &Connection,
        kind: EntryKind,
        epoch: SyncEpoch,
    ) -> StoreResult<Vec<Entry>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM entries WHERE kind = ?1 AND last_sync_epoch < ?2 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![kind.as_str(), epoch.as_millis()], Self::entry_row_raw)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(Self::entry_from_raw(row?)?);
        }
        Ok(out)
    }

    /// Names of descendants (prefix match under `/`) already stamped
    /// with the pass epoch.
    fn descendants_at_epoch_inner(
        conn: &Connection,
        dir: &CanonicalName,
        epoch: SyncEpoch,
    ) -> StoreResult<Vec<CanonicalName>> {
        let prefix = format!("{dir}/");
        let mut stmt = conn.prepare(
            "SELECT name FROM entries
             WHERE substr(name, 1, ?1) = ?2 AND last_sync_epoch >= ?3 ORDER BY name",
        )?;
        let rows = stmt.query_map(
            params![prefix.len() as i64, prefix, epoch.as_millis()],
            |row| row.get::<_, String>(0),
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(CanonicalName::new(row?));
        }
        Ok(out)
    }

    /// Re-links surviving descendants of a kept-but-unsynchronized
    /// directory as direct aliases so hierarchy listings stay navigable.
    fn link_deduced_children_inner(
        conn: &Connection,
        dir: &CanonicalName,
        survivors: &[CanonicalName],
        epoch: SyncEpoch,
    ) -> StoreResult<()> {
        let prefix = format!("{dir}/");
        for survivor in survivors {
            let rest = &survivor.as_str()[prefix.len()..];
            let direct = !rest.contains('/');
            let link = if direct {
                true
            } else {
                // Deeper survivor: only link it here when the
                // intermediate node is gone or obsolete.
                let first = &rest[..rest.find('/').unwrap_or(rest.len())];
                let mid = CanonicalName::new(format!("{prefix}{first}"));
                match Self::get_inner(conn, &mid)? {
                    Some(m) => m.is_obsolete(epoch),
                    None => true,
                }
            };
            if link {
                conn.execute(
                    "INSERT OR IGNORE INTO aliases (parent, local_name, target)
                     VALUES (?1, ?2, ?3)",
                    params![dir.as_str(), rest, survivor.as_str()],
                )?;
            }
        }
        Ok(())
    }

    fn delete_entry_inner(conn: &Connection, name: &CanonicalName) -> StoreResult<()> {
        debug!(name = %name, "hard-deleting empty directory entry");
        conn.execute("DELETE FROM entries WHERE name = ?1", params![name.as_str()])?;
        conn.execute(
            "DELETE FROM aliases WHERE parent = ?1 OR target = ?1",
            params![name.as_str()],
        )?;
        Ok(())
    }

    // ── Revisions ────────────────────────────────────────────────

    /// Revisions of an entry, newest first.
    pub fn revisions(&self, name: &CanonicalName) -> StoreResult<Vec<Revision>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT seq, entry_name, text, author, comment, created_at, review_state, approved
             FROM revisions WHERE entry_name = ?1 ORDER BY seq DESC",
        )?;
        let rows = stmt.query_map(params![name.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, bool>(7)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (seq, entry_name, text, author, comment, created_at, review_state, approved) =
                row?;
            out.push(Revision {
                seq,
                entry_name: CanonicalName::new(entry_name),
                text,
                author,
                comment,
                created_at: parse_timestamp(&created_at)?,
                review_state: review_state.parse()?,
                approved,
            });
        }
        Ok(out)
    }

    /// Marks a revision as approved (or not) for patch projection.
    pub fn approve_revision(&self, seq: i64, approved: bool) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE revisions SET approved = ?2 WHERE seq = ?1",
            params![seq, approved],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("revision {seq}")));
        }
        Ok(())
    }

    /// Sets the entry's review state, mirrored onto its latest revision.
    pub fn set_review_state(&self, name: &CanonicalName, state: ReviewState) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE entries SET review_state = ?2 WHERE name = ?1",
            params![name.as_str(), state.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(name.to_string()));
        }
        conn.execute(
            "UPDATE revisions SET review_state = ?2
             WHERE seq = (SELECT MAX(seq) FROM revisions WHERE entry_name = ?1)",
            params![name.as_str(), state.as_str()],
        )?;
        Ok(())
    }

    fn revision_count_inner(conn: &Connection, name: &CanonicalName) -> StoreResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM revisions WHERE entry_name = ?1",
            params![name.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn insert_revision_inner(
        conn: &Connection,
        name: &CanonicalName,
        text: &str,
        author: &str,
        comment: &str,
        review_state: ReviewState,
    ) -> StoreResult<()> {
        conn.execute(
            "INSERT INTO revisions (entry_name, text, author, comment, created_at, review_state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name.as_str(),
                text,
                author,
                comment,
                Utc::now().to_rfc3339(),
                review_state.as_str(),
            ],
        )?;
        Ok(())
    }

    // ── Comments ─────────────────────────────────────────────────

    /// Attaches a discussion note to an entry.
    pub fn add_comment(
        &self,
        name: &CanonicalName,
        revision_seq: Option<i64>,
        author: &str,
        text: &str,
    ) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO comments (entry_name, revision_seq, author, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                name.as_str(),
                revision_seq,
                author,
                text,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Comments on an entry, oldest first.
    pub fn comments(&self, name: &CanonicalName) -> StoreResult<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, entry_name, revision_seq, author, text, created_at, resolved
             FROM comments WHERE entry_name = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![name.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, entry_name, revision_seq, author, text, created_at, resolved) = row?;
            out.push(Comment {
                id,
                entry_name: CanonicalName::new(entry_name),
                revision_seq,
                author,
                text,
                created_at: parse_timestamp(&created_at)?,
                resolved,
            });
        }
        Ok(out)
    }

    /// Flags a comment as resolved or reopened.
    pub fn resolve_comment(&self, id: i64, resolved: bool) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE comments SET resolved = ?2 WHERE id = ?1",
            params![id, resolved],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("comment {id}")));
        }
        Ok(())
    }

    // ── Derived caches ───────────────────────────────────────────

    /// Rebuilds title, label and toctree caches for one file entry.
    pub fn rebuild_entry_caches(&self, name: &CanonicalName) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        Self::rebuild_entry_caches_inner(&conn, name)
    }

    /// Rebuilds the derived caches for every non-obsolete file entry.
    pub fn rebuild_file_caches(&self, epoch: SyncEpoch) -> StoreResult<()> {
        let names: Vec<CanonicalName> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT name FROM entries WHERE kind = 'file' AND last_sync_epoch >= ?1",
            )?;
            let rows = stmt.query_map(params![epoch.as_millis()], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(CanonicalName::new(row?));
            }
            out
        };
        let conn = self.conn.lock().unwrap();
        for name in &names {
            Self::rebuild_entry_caches_inner(&conn, name)?;
        }
        Ok(())
    }

    fn rebuild_entry_caches_inner(conn: &Connection, name: &CanonicalName) -> StoreResult<()> {
        let entry =
            Self::get_inner(conn, name)?.ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if entry.kind != EntryKind::File {
            return Ok(());
        }
        let current = Self::current_text_inner(conn, name, &entry.source_text)?;

        let title = rst::extract_title(&current);
        conn.execute(
            "UPDATE entries SET title = ?2 WHERE name = ?1",
            params![name.as_str(), title],
        )?;

        conn.execute(
            "DELETE FROM label_cache WHERE entry_name = ?1",
            params![name.as_str()],
        )?;
        for label in rst::labels(&current) {
            conn.execute(
                "INSERT OR IGNORE INTO label_cache (label, entry_name, title) VALUES (?1, ?2, ?3)",
                params![label, name.as_str(), title],
            )?;
        }

        conn.execute(
            "DELETE FROM toc_cache WHERE parent_name = ?1",
            params![name.as_str()],
        )?;
        let base_dir = name.parent();
        for (position, child) in rst::toctree_children(&current).iter().enumerate() {
            // Toctree entries are document paths, so the join is always
            // slash-separated regardless of the parent's own separator.
            let child_name = match (&base_dir, child.starts_with('/')) {
                (Some(dir), false) => format!("{dir}/{child}"),
                _ => child.trim_start_matches('/').to_string(),
            };
            conn.execute(
                "INSERT OR IGNORE INTO toc_cache (parent_name, position, child_name)
                 VALUES (?1, ?2, ?3)",
                params![name.as_str(), position as i64, child_name],
            )?;
        }
        Ok(())
    }

    /// Cross-reference labels: `(label, entry_name, title)` rows, sorted.
    pub fn labels(&self) -> StoreResult<Vec<(String, CanonicalName, Option<String>)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT label, entry_name, title FROM label_cache ORDER BY label, entry_name")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (label, entry, title) = row?;
            out.push((label, CanonicalName::new(entry), title));
        }
        Ok(out)
    }

    /// Toctree children of a file entry, in listed order.
    pub fn toc_children(&self, name: &CanonicalName) -> StoreResult<Vec<CanonicalName>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT child_name FROM toc_cache WHERE parent_name = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![name.as_str()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(CanonicalName::new(row?));
        }
        Ok(out)
    }

    // ── Row mapping ──────────────────────────────────────────────

    fn get_inner(conn: &Connection, name: &CanonicalName) -> StoreResult<Option<Entry>> {
        let raw = conn
            .query_row(
                "SELECT * FROM entries WHERE name = ?1",
                params![name.as_str()],
                Self::entry_row_raw,
            )
            .optional()?;
        raw.map(Self::entry_from_raw).transpose()
    }

    fn current_text_inner(
        conn: &Connection,
        name: &CanonicalName,
        source_text: &str,
    ) -> StoreResult<String> {
        let latest: Option<String> = conn
            .query_row(
                "SELECT text FROM revisions WHERE entry_name = ?1 ORDER BY seq DESC LIMIT 1",
                params![name.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(latest.unwrap_or_else(|| source_text.to_string()))
    }

    fn refresh_dirty_inner(conn: &Connection, name: &CanonicalName) -> StoreResult<()> {
        let entry =
            Self::get_inner(conn, name)?.ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let current = Self::current_text_inner(conn, name, &entry.source_text)?;
        conn.execute(
            "UPDATE entries SET dirty = ?2 WHERE name = ?1",
            params![name.as_str(), current != entry.source_text],
        )?;
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn entry_row_raw(
        row: &Row<'_>,
    ) -> rusqlite::Result<(
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
        Option<String>,
        Option<u32>,
        String,
        String,
        i64,
        String,
        bool,
        String,
        Option<String>,
    )> {
        Ok((
            row.get("name")?,
            row.get("kind")?,
            row.get("type_name")?,
            row.get("arg_spec")?,
            row.get("owner_class")?,
            row.get("base_types")?,
            row.get("file_path")?,
            row.get("line_number")?,
            row.get("source_text")?,
            row.get("base_text")?,
            row.get("last_sync_epoch")?,
            row.get("merge_state")?,
            row.get("dirty")?,
            row.get("review_state")?,
            row.get("title")?,
        ))
    }

    #[allow(clippy::type_complexity)]
    fn entry_from_raw(
        raw: (
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            Option<String>,
            Option<u32>,
            String,
            String,
            i64,
            String,
            bool,
            String,
            Option<String>,
        ),
    ) -> StoreResult<Entry> {
        let (
            name,
            kind,
            type_name,
            arg_spec,
            owner_class,
            base_types,
            file_path,
            line_number,
            source_text,
            base_text,
            last_sync_epoch,
            merge_state,
            dirty,
            review_state,
            title,
        ) = raw;
        Ok(Entry {
            name: CanonicalName::new(name),
            kind: kind.parse()?,
            type_name,
            arg_spec,
            owner_class,
            base_types: serde_json::from_str(&base_types)?,
            file_path,
            line_number,
            source_text,
            base_text,
            last_sync_epoch: SyncEpoch::from_millis(last_sync_epoch),
            merge_state: merge_state.parse()?,
            dirty,
            review_state: review_state.parse()?,
            title,
        })
    }
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp {value:?}: {e}")))
}
