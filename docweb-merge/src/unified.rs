//! Unified-diff rendering.
//!
//! Renders the difference between two line sequences as a standard
//! unified diff with three lines of context, one `---`/`+++` header per
//! call. The patch projector concatenates one section per touched file.

use crate::diff::{diff_lines, Hunk};

const CONTEXT: usize = 3;

/// Renders a unified diff between `old` and `new`. Returns the empty
/// string when the sequences are equal.
#[must_use]
pub fn unified_diff(old_label: &str, new_label: &str, old: &[&str], new: &[&str]) -> String {
    let hunks = diff_lines(old, new);
    if hunks.is_empty() {
        return String::new();
    }

    let groups = group_with_context(&hunks);

    let mut out = String::new();
    out.push_str(&format!("--- {old_label}\n"));
    out.push_str(&format!("+++ {new_label}\n"));

    for group in groups {
        let a_lo = group.first().map(|h| h.a_start.saturating_sub(CONTEXT)).unwrap_or(0);
        let a_hi = group
            .last()
            .map(|h| (h.a_end + CONTEXT).min(old.len()))
            .unwrap_or(0);
        let b_lo = group.first().map(|h| h.b_start.saturating_sub(CONTEXT)).unwrap_or(0);
        let b_hi = group
            .last()
            .map(|h| (h.b_end + CONTEXT).min(new.len()))
            .unwrap_or(0);

        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            range(a_lo, a_hi - a_lo),
            range(b_lo, b_hi - b_lo)
        ));

        let mut a_pos = a_lo;
        for hunk in &group {
            for line in &old[a_pos..hunk.a_start] {
                out.push(' ');
                out.push_str(line);
                out.push('\n');
            }
            for line in &old[hunk.a_start..hunk.a_end] {
                out.push('-');
                out.push_str(line);
                out.push('\n');
            }
            for line in &new[hunk.b_start..hunk.b_end] {
                out.push('+');
                out.push_str(line);
                out.push('\n');
            }
            a_pos = hunk.a_end;
        }
        for line in &old[a_pos..a_hi] {
            out.push(' ');
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/// Groups hunks whose context windows touch into one `@@` section.
fn group_with_context(hunks: &[Hunk]) -> Vec<Vec<Hunk>> {
    let mut groups: Vec<Vec<Hunk>> = Vec::new();
    for &hunk in hunks {
        match groups.last_mut() {
            Some(group)
                if hunk.a_start <= group.last().map(|h| h.a_end).unwrap_or(0) + 2 * CONTEXT =>
            {
                group.push(hunk);
            }
            _ => groups.push(vec![hunk]),
        }
    }
    groups
}

/// Formats a line range in unified-diff convention: 1-based start, count
/// elided when 1, and the preceding line number for empty ranges.
fn range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_render_nothing() {
        assert_eq!(unified_diff("a.old", "a", &["x"], &["x"]), "");
    }

    #[test]
    fn single_change_with_context() {
        let old = vec!["a", "b", "c", "d", "e", "f", "g"];
        let new = vec!["a", "b", "c", "X", "e", "f", "g"];
        let diff = unified_diff("f.old", "f", &old, &new);
        assert!(diff.starts_with("--- f.old\n+++ f\n"));
        assert!(diff.contains("@@ -1,7 +1,7 @@\n"));
        assert!(diff.contains("-d\n+X\n"));
    }

    #[test]
    fn new_file_is_all_additions() {
        let diff = unified_diff("f.old", "f", &[], &["one", "two"]);
        assert!(diff.contains("@@ -0,0 +1,2 @@\n"));
        assert!(diff.contains("+one\n+two\n"));
    }

    #[test]
    fn distant_changes_get_separate_sections() {
        let old: Vec<String> = (0..30).map(|i| format!("l{i}")).collect();
        let old_refs: Vec<&str> = old.iter().map(String::as_str).collect();
        let mut new = old.clone();
        new[0] = "changed0".into();
        new[29] = "changed29".into();
        let new_refs: Vec<&str> = new.iter().map(String::as_str).collect();

        let diff = unified_diff("f.old", "f", &old_refs, &new_refs);
        assert_eq!(diff.matches("@@ ").count(), 2);
    }
}
