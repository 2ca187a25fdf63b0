//! Hierarchy lifecycle: obsolescence, survival of local edits,
//! resurrection and hiding.

use docweb_store::{DocStore, ObsolescenceStats};
use docweb_types::{CanonicalName, DumpEntry, DumpRef, EntryKind, MergeState, SyncEpoch};
use pretty_assertions::assert_eq;

fn store() -> DocStore {
    DocStore::open_in_memory().unwrap()
}

fn sync_one(store: &DocStore, entries: &[DumpEntry], epoch: SyncEpoch) -> ObsolescenceStats {
    for entry in entries {
        store.create_or_update_from_source(entry, epoch).unwrap();
    }
    let stats = store.apply_obsolescence(epoch).unwrap();
    store.set_epoch(epoch).unwrap();
    stats
}

fn dir(name: &str) -> DumpEntry {
    DumpEntry::new(name, EntryKind::Directory)
}

fn file(name: &str, text: &str) -> DumpEntry {
    DumpEntry::new(name, EntryKind::File).with_text(text)
}

// ── Obsolescence ─────────────────────────────────────────────────

#[test]
fn fresh_store_starts_at_epoch_zero() {
    let store = store();
    assert_eq!(store.epoch().unwrap(), SyncEpoch::ZERO);
}

#[test]
fn vanished_untouched_file_goes_obsolete() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let e2 = SyncEpoch::from_millis(2);
    sync_one(&store, &[dir("doc"), file("doc/index.rst", "")], e1);

    let stats = sync_one(&store, &[], e2);
    assert_eq!(stats.files_obsoleted, 1);
    assert_eq!(stats.dirs_deleted, 1);

    let name = CanonicalName::new("doc/index.rst");
    assert!(store.is_obsolete(&name).unwrap());
    // The empty directory row is gone entirely.
    assert!(store.get(&CanonicalName::new("doc")).unwrap().is_none());
    assert!(store.non_obsolete(None).unwrap().is_empty());
}

#[test]
fn edited_file_survives_upstream_deletion_as_conflict() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let e2 = SyncEpoch::from_millis(2);
    let name = CanonicalName::new("doc/page.rst");
    sync_one(&store, &[dir("doc"), file("doc/page.rst", "source text")], e1);
    store.edit(&name, "local text", "alice", "").unwrap();

    let stats = sync_one(&store, &[], e2);
    assert_eq!(stats.files_kept, 1);
    assert_eq!(stats.dirs_kept, 1);

    // Still visible, with the deletion surfaced as a merge conflict.
    assert!(!store.is_obsolete(&name).unwrap());
    let entry = store.entry(&name).unwrap();
    assert_eq!(entry.source_text, "");
    assert_eq!(entry.merge_state, MergeState::Conflict);
    assert_eq!(store.current_text(&name).unwrap(), "local text");
    // The parent directory is kept for its surviving child.
    assert!(!store.is_obsolete(&CanonicalName::new("doc")).unwrap());
}

#[test]
fn directory_with_own_text_is_kept_obsolete_not_deleted() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let e2 = SyncEpoch::from_millis(2);
    sync_one(
        &store,
        &[
            dir("doc").with_text("chapter intro"),
            file("doc/index.rst", ""),
        ],
        e1,
    );

    let stats = sync_one(&store, &[], e2);
    assert_eq!(stats.files_obsoleted, 1);
    assert_eq!(stats.dirs_obsoleted, 1);
    assert_eq!(stats.dirs_deleted, 0);

    let name = CanonicalName::new("doc");
    assert!(store.get(&name).unwrap().is_some());
    assert!(store.is_obsolete(&name).unwrap());
}

#[test]
fn kept_directory_links_surviving_children() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let e2 = SyncEpoch::from_millis(2);
    let deep = CanonicalName::new("doc/sub/deep.rst");
    sync_one(
        &store,
        &[dir("doc"), dir("doc/sub"), file("doc/sub/deep.rst", "s")],
        e1,
    );
    store.edit(&deep, "local", "alice", "").unwrap();

    let stats = sync_one(&store, &[], e2);
    assert_eq!(stats.files_kept, 1);
    assert_eq!(stats.dirs_kept, 2);

    let aliases = store.aliases_of(&CanonicalName::new("doc")).unwrap();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].local_name, "sub");
    assert_eq!(aliases[0].target, CanonicalName::new("doc/sub"));

    let sub_aliases = store.aliases_of(&CanonicalName::new("doc/sub")).unwrap();
    assert_eq!(sub_aliases.len(), 1);
    assert_eq!(sub_aliases[0].local_name, "deep.rst");
    assert_eq!(sub_aliases[0].target, deep);
}

#[test]
fn reappearing_entry_is_current_again() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let e2 = SyncEpoch::from_millis(2);
    let e3 = SyncEpoch::from_millis(3);
    let name = CanonicalName::new("doc/page.rst");
    sync_one(
        &store,
        &[dir("doc").with_text("d"), file("doc/page.rst", "text")],
        e1,
    );
    sync_one(&store, &[], e2);
    assert!(store.is_obsolete(&name).unwrap());

    sync_one(
        &store,
        &[dir("doc").with_text("d"), file("doc/page.rst", "text")],
        e3,
    );
    assert!(!store.is_obsolete(&name).unwrap());
}

// ── Resurrection & hiding ────────────────────────────────────────

#[test]
fn editing_obsolete_file_resurrects_it() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let e2 = SyncEpoch::from_millis(2);
    let name = CanonicalName::new("doc/notes.rst");
    sync_one(&store, &[dir("doc"), file("doc/notes.rst", "")], e1);
    sync_one(&store, &[], e2);
    assert!(store.is_obsolete(&name).unwrap());
    assert!(store.get(&CanonicalName::new("doc")).unwrap().is_none());

    store.edit(&name, "revived notes", "alice", "").unwrap();

    assert!(!store.is_obsolete(&name).unwrap());
    // The deleted parent directory came back with the file.
    let parent = store.entry(&CanonicalName::new("doc")).unwrap();
    assert_eq!(parent.kind, EntryKind::Directory);
    assert!(!store.is_obsolete(&parent.name).unwrap());
    let aliases = store.aliases_of(&parent.name).unwrap();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].target, name);
}

#[test]
fn emptying_a_file_hides_it_from_listings() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let name = CanonicalName::new("doc/scratch.rst");
    sync_one(&store, &[dir("doc"), file("doc/scratch.rst", "draft")], e1);
    store
        .replace_aliases(
            &CanonicalName::new("doc"),
            &[docweb_types::DumpRef {
                local_name: "scratch.rst".to_string(),
                target: name.clone(),
                in_all: None,
            }],
        )
        .unwrap();

    store.edit(&name, "", "alice", "retire").unwrap();

    assert!(store.aliases_of(&CanonicalName::new("doc")).unwrap().is_empty());
    // The row and its history persist.
    assert_eq!(store.current_text(&name).unwrap(), "");
    assert_eq!(store.revisions(&name).unwrap().len(), 2);
}

#[test]
fn re_saving_an_empty_file_keeps_its_aliases() {
    let store = store();
    let e1 = SyncEpoch::from_millis(1);
    let name = CanonicalName::new("doc/blank.rst");
    sync_one(&store, &[dir("doc"), file("doc/blank.rst", "")], e1);
    store
        .replace_aliases(
            &CanonicalName::new("doc"),
            &[DumpRef {
                local_name: "blank.rst".to_string(),
                target: name.clone(),
                in_all: None,
            }],
        )
        .unwrap();

    // Empty to empty is not a hiding transition.
    store.edit(&name, "", "alice", "").unwrap();
    assert_eq!(store.aliases_of(&CanonicalName::new("doc")).unwrap().len(), 1);
}

#[test]
fn ensure_file_builds_missing_ancestry() {
    let store = store();
    let epoch = SyncEpoch::from_millis(5);
    store.set_epoch(epoch).unwrap();
    let name = CanonicalName::new("doc/guides/new.rst");

    store.ensure_file(&name, epoch).unwrap();

    let entry = store.entry(&name).unwrap();
    assert_eq!(entry.kind, EntryKind::File);
    assert!(!store.is_obsolete(&name).unwrap());
    for dir_name in ["doc", "doc/guides"] {
        let dir_entry = store.entry(&CanonicalName::new(dir_name)).unwrap();
        assert_eq!(dir_entry.kind, EntryKind::Directory);
        assert!(!store.is_obsolete(&dir_entry.name).unwrap());
    }
    let aliases = store.aliases_of(&CanonicalName::new("doc/guides")).unwrap();
    assert_eq!(aliases[0].target, name);

    // Idempotent.
    store.ensure_file(&name, epoch).unwrap();
    assert_eq!(store.non_obsolete(Some(EntryKind::File)).unwrap().len(), 1);
}
