//! Property-based tests for the merge primitives.
//!
//! The synchronization engine's idempotence rests on these: merging is a
//! pure function, one-sided changes never conflict, and normalization is
//! stable under repetition.

use docweb_merge::{contains_conflict_markers, merge3, normalize};
use proptest::prelude::*;

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z ]{0,12}", 0..8).prop_map(|lines| lines.join("\n"))
}

proptest! {
    /// Determinism: identical inputs yield identical outcomes.
    #[test]
    fn merge_is_deterministic(
        mine in text_strategy(),
        base in text_strategy(),
        other in text_strategy(),
    ) {
        let a = merge3(&mine, &base, &other);
        let b = merge3(&mine, &base, &other);
        prop_assert_eq!(a, b);
    }

    /// If the local side did not change, the upstream side wins outright.
    #[test]
    fn unchanged_mine_takes_other(base in text_strategy(), other in text_strategy()) {
        let out = merge3(&base, &base, &other);
        prop_assert!(!out.has_conflict);
        prop_assert_eq!(out.text, normalize(&other));
    }

    /// If upstream did not change, the local edit survives untouched.
    #[test]
    fn unchanged_other_takes_mine(base in text_strategy(), mine in text_strategy()) {
        let out = merge3(&mine, &base, &base);
        prop_assert!(!out.has_conflict);
        prop_assert_eq!(out.text, normalize(&mine));
    }

    /// Identical edits on both sides merge silently.
    #[test]
    fn identical_edits_never_conflict(base in text_strategy(), edit in text_strategy()) {
        let out = merge3(&edit, &base, &edit);
        prop_assert!(!out.has_conflict);
        prop_assert_eq!(out.text, normalize(&edit));
    }

    /// Normalization is idempotent.
    #[test]
    fn normalize_is_idempotent(text in "[a-z \n\t]{0,64}") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    /// A conflicting outcome always carries visible markers.
    #[test]
    fn conflicts_carry_markers(
        mine in text_strategy(),
        base in text_strategy(),
        other in text_strategy(),
    ) {
        let out = merge3(&mine, &base, &other);
        if out.has_conflict {
            prop_assert!(contains_conflict_markers(&out.text));
        }
    }
}
