//! Three-way merge with conflict markers.
//!
//! `merge3(mine, base, other)` reconciles two diverging edits of a text
//! against their common ancestor. Regions changed on only one side take
//! that side's lines; identical changes collapse; diverging changes
//! become a marked conflict region. Adjacent or overlapping changes are
//! folded into one region, so touching edits conflict rather than
//! interleave.

use crate::diff::diff_lines;
use crate::normalize::{normalize, split_lines};
use serde::{Deserialize, Serialize};

/// Marker opening the local ("web") side of a conflict region.
pub const MARKER_MINE: &str = "<<<<<<< web version";
/// Marker separating the two sides.
pub const MARKER_SEPARATOR: &str = "=======";
/// Marker closing the upstream ("new source") side.
pub const MARKER_OTHER: &str = ">>>>>>> new source version";

/// Result of a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Merged text, normalized; contains conflict markers when
    /// `has_conflict` is set.
    pub text: String,
    /// True if at least one region could not be merged cleanly.
    pub has_conflict: bool,
}

/// Returns true when any line of `text` starts with a conflict marker.
/// Used to reject edits that would silently persist unresolved conflicts.
/// Only the opening and closing markers count: a bare `=======` line is
/// legitimate content (a reStructuredText section underline) and is only
/// a separator inside a marked region.
#[must_use]
pub fn contains_conflict_markers(text: &str) -> bool {
    text.lines()
        .any(|l| l.starts_with("<<<<<<<") || l.starts_with(">>>>>>>"))
}

/// Merges `mine` and `other` against their common ancestor `base`.
///
/// Pure and deterministic: the outcome depends only on the three inputs.
#[must_use]
pub fn merge3(mine: &str, base: &str, other: &str) -> MergeOutcome {
    let mine_n = normalize(mine);
    let base_n = normalize(base);
    let other_n = normalize(other);

    let mine_l = split_lines(&mine_n);
    let base_l = split_lines(&base_n);
    let other_l = split_lines(&other_n);

    let mine_hunks = diff_lines(&base_l, &mine_l);
    let other_hunks = diff_lines(&base_l, &other_l);

    let mut out: Vec<&str> = Vec::new();
    let mut has_conflict = false;

    let mut i1 = 0; // next unconsumed hunk, base -> mine
    let mut i2 = 0; // next unconsumed hunk, base -> other
    let mut pos = 0; // next unconsumed base line
    let mut off1: isize = 0; // cumulative length delta of consumed mine hunks
    let mut off2: isize = 0;

    loop {
        let next1 = mine_hunks.get(i1).map(|h| h.a_start);
        let next2 = other_hunks.get(i2).map(|h| h.a_start);
        let lo = match (next1, next2) {
            (None, None) => break,
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (Some(a), Some(b)) => a.min(b),
        };

        out.extend(&base_l[pos..lo]);

        // Absorb every hunk from either side that touches the region,
        // growing it until both sides are clear of it.
        let mut hi = lo;
        let mut delta1: isize = 0;
        let mut delta2: isize = 0;
        loop {
            let mut grew = false;
            while let Some(h) = mine_hunks.get(i1) {
                if h.a_start <= hi {
                    hi = hi.max(h.a_end);
                    delta1 += h.delta();
                    i1 += 1;
                    grew = true;
                } else {
                    break;
                }
            }
            while let Some(h) = other_hunks.get(i2) {
                if h.a_start <= hi {
                    hi = hi.max(h.a_end);
                    delta2 += h.delta();
                    i2 += 1;
                    grew = true;
                } else {
                    break;
                }
            }
            if !grew {
                break;
            }
        }

        let mine_lo = (lo as isize + off1) as usize;
        let mine_hi = (hi as isize + off1 + delta1) as usize;
        let other_lo = (lo as isize + off2) as usize;
        let other_hi = (hi as isize + off2 + delta2) as usize;
        off1 += delta1;
        off2 += delta2;

        let base_slice = &base_l[lo..hi];
        let mine_slice = &mine_l[mine_lo..mine_hi];
        let other_slice = &other_l[other_lo..other_hi];

        if mine_slice == base_slice {
            out.extend(other_slice);
        } else if other_slice == base_slice || mine_slice == other_slice {
            out.extend(mine_slice);
        } else {
            has_conflict = true;
            out.push(MARKER_MINE);
            out.extend(mine_slice);
            out.push(MARKER_SEPARATOR);
            out.extend(other_slice);
            out.push(MARKER_OTHER);
        }

        pos = hi;
    }

    out.extend(&base_l[pos..]);

    MergeOutcome {
        text: normalize(&out.join("\n")),
        has_conflict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_side_unchanged_takes_the_other() {
        let base = "a\nb\nc";
        let other = "a\nB\nc";
        let out = merge3(base, base, other);
        assert_eq!(out.text, other);
        assert!(!out.has_conflict);

        let out = merge3(other, base, base);
        assert_eq!(out.text, other);
        assert!(!out.has_conflict);
    }

    #[test]
    fn disjoint_edits_combine() {
        let out = merge3("text edited\n\nmore", "text\n\nmore", "text\n\nmore2");
        assert_eq!(out.text, "text edited\n\nmore2");
        assert!(!out.has_conflict);
    }

    #[test]
    fn diverging_edit_conflicts() {
        let out = merge3("text edited", "text", "text2");
        assert!(out.has_conflict);
        assert!(out.text.contains(MARKER_MINE));
        assert!(out.text.contains("text edited"));
        assert!(out.text.contains("text2"));
        assert!(out.text.contains(MARKER_OTHER));
    }

    #[test]
    fn identical_changes_merge_silently() {
        let out = merge3("same", "base", "same");
        assert_eq!(out.text, "same");
        assert!(!out.has_conflict);
    }

    #[test]
    fn marker_detection() {
        assert!(contains_conflict_markers("x\n<<<<<<< web version\ny"));
        assert!(contains_conflict_markers("y\n>>>>>>> new source version"));
        assert!(!contains_conflict_markers("plain text"));
    }

    #[test]
    fn section_underlines_are_not_markers() {
        assert!(!contains_conflict_markers("User Guide\n==========\n\nbody"));
        assert!(!contains_conflict_markers("Short\n=======\n\nbody"));
    }
}
