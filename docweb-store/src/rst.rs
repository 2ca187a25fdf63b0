//! Light-weight reStructuredText scanning for the derived caches.
//!
//! These are read-path helpers only: page titles, `.. _label:`
//! cross-reference targets and `.. toctree::` child listings. Rendering
//! correctness is a consumer concern; the store only needs stable keys.

const UNDERLINE_CHARS: &str = "=-~^\"'`#*+:._";

fn is_underline(line: &str) -> bool {
    let line = line.trim_end();
    line.len() >= 2
        && line
            .chars()
            .next()
            .is_some_and(|c| UNDERLINE_CHARS.contains(c))
        && line.chars().all(|c| c == line.chars().next().unwrap())
}

/// Extracts the page title: the first section heading (a non-empty line
/// underlined by a run of punctuation at least as long).
#[must_use]
pub fn extract_title(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    for pair in lines.windows(2) {
        let title = pair[0].trim();
        let under = pair[1].trim_end();
        if !title.is_empty()
            && !is_underline(title)
            && is_underline(under)
            && under.chars().count() >= title.chars().count()
        {
            return Some(title.to_string());
        }
    }
    None
}

/// Collects `.. _label:` cross-reference targets, in order of appearance.
#[must_use]
pub fn labels(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            line.trim()
                .strip_prefix(".. _")
                .and_then(|rest| rest.strip_suffix(':'))
                .map(str::to_string)
        })
        .filter(|l| !l.is_empty())
        .collect()
}

/// Collects the document names listed under `.. toctree::` directives,
/// in order. Entries of the form `Title <doc>` yield the bracketed name.
#[must_use]
pub fn toctree_children(text: &str) -> Vec<String> {
    let mut children = Vec::new();
    let mut in_toctree = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed == ".. toctree::" {
            in_toctree = true;
            continue;
        }
        if in_toctree {
            if trimmed.is_empty() {
                continue;
            }
            let indented = line.starts_with(' ') || line.starts_with('\t');
            if !indented {
                in_toctree = false;
                continue;
            }
            if trimmed.starts_with(':') {
                // directive option, e.g. :maxdepth: 2
                continue;
            }
            let name = match (trimmed.rfind('<'), trimmed.rfind('>')) {
                (Some(lt), Some(gt)) if lt < gt => &trimmed[lt + 1..gt],
                _ => trimmed,
            };
            children.push(name.to_string());
        }
    }

    children
}
