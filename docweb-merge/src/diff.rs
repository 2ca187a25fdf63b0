//! Line diff via Myers' shortest-edit-script algorithm.
//!
//! Produces the changed regions between two line sequences. Both the
//! three-way merge and the unified-diff renderer are built on this.

/// A contiguous changed region: `a[a_start..a_end]` was replaced by
/// `b[b_start..b_end]`. Either side may be empty (pure insertion or
/// deletion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

impl Hunk {
    /// Net length change contributed by this hunk.
    #[must_use]
    pub fn delta(&self) -> isize {
        (self.b_end - self.b_start) as isize - (self.a_end - self.a_start) as isize
    }
}

/// Computes the changed regions between `a` and `b`, in order.
#[must_use]
pub fn diff_lines(a: &[&str], b: &[&str]) -> Vec<Hunk> {
    let (a_changed, b_changed) = changed_lines(a, b);
    group_hunks(&a_changed, &b_changed)
}

/// Runs Myers' algorithm and marks which lines of each side participate
/// in an edit.
fn changed_lines(a: &[&str], b: &[&str]) -> (Vec<bool>, Vec<bool>) {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let mut a_changed = vec![false; a.len()];
    let mut b_changed = vec![false; b.len()];
    if n == 0 && m == 0 {
        return (a_changed, b_changed);
    }

    let max = n + m;
    let offset = max;
    let width = (2 * max + 1) as usize;
    let mut v = vec![0usize; width];
    let mut trace: Vec<Vec<usize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1] as isize
            } else {
                v[idx - 1] as isize + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x as usize;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Backtrack through the trace, marking the single edit taken at each
    // step. Equal lines are the diagonal moves in between.
    let mut x = n;
    let mut y = m;
    for d in (0..trace.len()).rev() {
        let vd = &trace[d];
        let d_i = d as isize;
        let k = x - y;
        let prev_k = if k == -d_i || (k != d_i && vd[(k - 1 + offset) as usize] < vd[(k + 1 + offset) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = vd[(prev_k + offset) as usize] as isize;
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                b_changed[prev_y as usize] = true;
            } else {
                a_changed[prev_x as usize] = true;
            }
            x = prev_x;
            y = prev_y;
        }
    }

    (a_changed, b_changed)
}

/// Groups the per-line change marks into aligned hunks. Unchanged lines
/// advance both sides in lockstep, so runs of changes on either side pair
/// up at the same alignment point.
fn group_hunks(a_changed: &[bool], b_changed: &[bool]) -> Vec<Hunk> {
    let n = a_changed.len();
    let m = b_changed.len();
    let mut hunks = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < n || j < m {
        let a_hit = i < n && a_changed[i];
        let b_hit = j < m && b_changed[j];
        if a_hit || b_hit {
            let a_start = i;
            let b_start = j;
            while i < n && a_changed[i] {
                i += 1;
            }
            while j < m && b_changed[j] {
                j += 1;
            }
            hunks.push(Hunk {
                a_start,
                a_end: i,
                b_start,
                b_end: j,
            });
        } else {
            i += 1;
            j += 1;
        }
    }

    hunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_sequences_have_no_hunks() {
        assert!(diff_lines(&["a", "b"], &["a", "b"]).is_empty());
        assert!(diff_lines(&[], &[]).is_empty());
    }

    #[test]
    fn single_replacement() {
        let hunks = diff_lines(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(
            hunks,
            vec![Hunk {
                a_start: 1,
                a_end: 2,
                b_start: 1,
                b_end: 2
            }]
        );
    }

    #[test]
    fn separate_edits_stay_separate() {
        let hunks = diff_lines(&["a", "b", "c", "d", "e"], &["x", "b", "c", "d", "y"]);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].a_start, 0);
        assert_eq!(hunks[1].a_start, 4);
    }

    #[test]
    fn pure_insertion_and_deletion() {
        let ins = diff_lines(&["a", "c"], &["a", "b", "c"]);
        assert_eq!(
            ins,
            vec![Hunk {
                a_start: 1,
                a_end: 1,
                b_start: 1,
                b_end: 2
            }]
        );

        let del = diff_lines(&["a", "b", "c"], &["a", "c"]);
        assert_eq!(
            del,
            vec![Hunk {
                a_start: 1,
                a_end: 2,
                b_start: 1,
                b_end: 1
            }]
        );
    }

    #[test]
    fn everything_replaced() {
        let hunks = diff_lines(&["a"], &["x", "y"]);
        assert_eq!(hunks.len(), 1);
        assert_eq!((hunks[0].a_start, hunks[0].a_end), (0, 1));
        assert_eq!((hunks[0].b_start, hunks[0].b_end), (0, 2));
    }
}
