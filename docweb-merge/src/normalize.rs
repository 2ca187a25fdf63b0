//! Whitespace normalization.
//!
//! Docstrings drift in trailing whitespace and blank-line padding between
//! the source tree and the web editor. Both merge inputs and merge output
//! are normalized so that whitespace-only drift never produces a
//! conflict.

/// Strips trailing whitespace from every line and trims leading and
/// trailing blank lines. Idempotent.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();

    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Splits normalized text into lines. The empty string yields no lines
/// (not one empty line), so empty texts diff as empty sequences.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}
