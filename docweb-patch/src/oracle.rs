//! Statement-boundary discovery.
//!
//! Locating the exact span of a docstring-bearing statement is a
//! language-specific job. The projector only needs the contract captured
//! by [`BoundaryOracle`]; a real language parser can stand behind it.
//! [`TripleQuoteOracle`] is the built-in implementation for languages
//! with triple-quoted string literals.

/// The span of a docstring literal inside a source file.
///
/// Lines and columns are 0-based; `end_col` is exclusive on the last
/// line, so the spanned text is `lines[start_line][start_col..]` through
/// `lines[end_line][..end_col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementSpan {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

/// Finds the docstring span belonging to the definition at a given line.
pub trait BoundaryOracle {
    /// Returns the span of the docstring literal for the statement at
    /// the 1-based `line`, or `None` when no docstring can be located.
    fn docstring_span(&self, source: &str, line: u32) -> Option<StatementSpan>;
}

/// Built-in oracle: scans a bounded window of lines at and below the
/// definition line for the first triple-quoted (`"""` or `'''`) literal
/// and returns its exact span.
#[derive(Debug, Clone)]
pub struct TripleQuoteOracle {
    /// How many lines below the definition line to consider.
    window: usize,
}

impl Default for TripleQuoteOracle {
    fn default() -> Self {
        Self { window: 10 }
    }
}

impl TripleQuoteOracle {
    /// Creates an oracle with a custom scan window.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

const DELIMITERS: [&str; 2] = ["\"\"\"", "'''"];

impl BoundaryOracle for TripleQuoteOracle {
    fn docstring_span(&self, source: &str, line: u32) -> Option<StatementSpan> {
        let lines: Vec<&str> = source.lines().collect();
        let first = (line as usize).saturating_sub(1);
        let last = (first + self.window).min(lines.len());

        for (i, text) in lines.iter().enumerate().take(last).skip(first) {
            let open = DELIMITERS
                .iter()
                .filter_map(|d| text.find(d).map(|col| (col, *d)))
                .min_by_key(|(col, _)| *col);
            let Some((start_col, delim)) = open else {
                continue;
            };

            // Closing delimiter on the same line, after the opener.
            let after = &text[start_col + delim.len()..];
            if let Some(rel) = after.find(delim) {
                let end_col = start_col + delim.len() + rel + delim.len();
                return Some(StatementSpan {
                    start_line: i,
                    start_col,
                    end_line: i,
                    end_col,
                });
            }

            // Otherwise scan forward for the closer.
            for (j, close_text) in lines.iter().enumerate().skip(i + 1) {
                if let Some(col) = close_text.find(delim) {
                    return Some(StatementSpan {
                        start_line: i,
                        start_col,
                        end_line: j,
                        end_col: col + delim.len(),
                    });
                }
            }
            // Unterminated literal.
            return None;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"import os

def f(x):
    """Single line docstring."""
    return x

class C:
    '''
    Multi-line
    docstring.
    '''
    pass
"#;

    #[test]
    fn finds_single_line_docstring() {
        let oracle = TripleQuoteOracle::default();
        let span = oracle.docstring_span(SOURCE, 3).unwrap();
        assert_eq!(
            span,
            StatementSpan {
                start_line: 3,
                start_col: 4,
                end_line: 3,
                end_col: 32,
            }
        );
    }

    #[test]
    fn finds_multi_line_docstring() {
        let oracle = TripleQuoteOracle::default();
        let span = oracle.docstring_span(SOURCE, 7).unwrap();
        assert_eq!(span.start_line, 7);
        assert_eq!(span.start_col, 4);
        assert_eq!(span.end_line, 10);
        assert_eq!(span.end_col, 7);
    }

    #[test]
    fn no_docstring_in_window_is_none() {
        let oracle = TripleQuoteOracle::new(2);
        assert_eq!(oracle.docstring_span("x = 1\ny = 2\nz = 3\n", 1), None);
    }
}
