//! Projects edited entry text back onto the original source tree as a
//! unified diff.

use crate::oracle::{BoundaryOracle, StatementSpan};
use crate::source::SourceReader;
use docweb_merge::unified_diff;
use docweb_types::Dump;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Texts longer than this always use multi-line quoting.
const SINGLE_LINE_LIMIT: usize = 70;

/// The result of one patch projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Unified diff, one section per touched file, sorted by path.
    pub diff: String,
    /// Per-entry diagnostics for locations that could not be resolved.
    /// These entries appear in the diff as `<name>.docstring` stubs.
    pub errors: Vec<String>,
}

struct Replacement {
    line: u32,
    name: String,
    text: String,
}

/// Computes the unified diff that rewrites each changed entry's
/// docstring in place.
///
/// `old_dump` is the last dump extracted from the pristine source tree
/// (authoritative for locations and original text); `new_dump` carries
/// the edited text. Entries whose location is missing or unresolvable
/// get a diagnostic plus a stub `<name>.docstring` section, so one bad
/// entry never blocks the rest of the patch.
pub fn project_patch(
    old_dump: &Dump,
    new_dump: &Dump,
    reader: &SourceReader,
    oracle: &dyn BoundaryOracle,
) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    // path -> replacements, collected before any surgery so that every
    // file is rewritten in one deterministic pass.
    let mut by_file: BTreeMap<String, Vec<Replacement>> = BTreeMap::new();
    let mut stubs: BTreeMap<String, String> = BTreeMap::new();

    for name in new_dump.names() {
        let Some(new_entry) = new_dump.get(name) else {
            continue;
        };
        let old_entry = old_dump.get(name);

        let old_text = old_entry.map(|e| e.text.as_str()).unwrap_or("");
        if new_entry.text == old_text {
            continue;
        }

        let location = old_entry.and_then(|e| {
            e.file_path
                .as_deref()
                .zip(e.line_number)
                .map(|(f, l)| (f.to_string(), l))
        });
        match location {
            Some((file, line)) => {
                by_file.entry(file).or_default().push(Replacement {
                    line,
                    name: name.to_string(),
                    text: new_entry.text.clone(),
                });
            }
            None => {
                if old_entry.is_some() {
                    outcome
                        .errors
                        .push(format!("{name}: no source location recorded"));
                }
                stubs.insert(stub_path(name.as_str()), new_entry.text.clone());
            }
        }
    }

    let mut sections: BTreeMap<String, (String, String)> = BTreeMap::new();
    for (path, mut replacements) in by_file {
        let source = match reader.read(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path, error = %e, "source file unavailable, emitting stubs");
                for r in replacements {
                    outcome.errors.push(format!("{}: {e}", r.name));
                    stubs.insert(stub_path(&r.name), r.text);
                }
                continue;
            }
        };

        let mut lines: Vec<String> = source.lines().map(str::to_string).collect();
        // Bottom-up, so earlier spans stay valid as lines shift.
        replacements.sort_by(|a, b| b.line.cmp(&a.line).then(a.name.cmp(&b.name)));
        for r in replacements {
            match oracle.docstring_span(&source, r.line) {
                Some(span) => {
                    debug!(name = %r.name, path = %path, line = r.line, "rewriting docstring");
                    apply_replacement(&mut lines, span, &r.text);
                }
                None => {
                    outcome
                        .errors
                        .push(format!("{}: no docstring found at {path}:{}", r.name, r.line));
                    stubs.insert(stub_path(&r.name), r.text);
                }
            }
        }

        let trailing_newline = source.ends_with('\n');
        let mut patched = lines.join("\n");
        if trailing_newline && !patched.is_empty() {
            patched.push('\n');
        }
        sections.insert(path, (source, patched));
    }

    for (path, text) in stubs {
        let mut content = text;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        sections.insert(path, (String::new(), content));
    }

    for (path, (old, new)) in &sections {
        let old_label = format!("{path}.old");
        let old_lines: Vec<&str> = old.lines().collect();
        let new_lines: Vec<&str> = new.lines().collect();
        outcome
            .diff
            .push_str(&unified_diff(&old_label, path, &old_lines, &new_lines));
    }
    outcome
}

fn stub_path(name: &str) -> String {
    format!("{name}.docstring")
}

/// Splices the quoted new text over the old docstring span, preserving
/// any code on the boundary lines.
fn apply_replacement(lines: &mut Vec<String>, span: StatementSpan, text: &str) {
    let prefix = lines[span.start_line][..span.start_col].to_string();
    let suffix = lines[span.end_line][span.end_col..].to_string();
    let indent = if prefix.chars().all(char::is_whitespace) {
        prefix.clone()
    } else {
        " ".repeat(span.start_col)
    };

    let quoted = quote_docstring(text, &indent);
    let mut replacement: Vec<String> = Vec::with_capacity(quoted.len());
    for (i, line) in quoted.iter().enumerate() {
        let mut out = String::new();
        if i == 0 {
            out.push_str(&prefix);
        }
        out.push_str(line);
        if i == quoted.len() - 1 {
            out.push_str(&suffix);
        }
        replacement.push(out);
    }

    lines.splice(span.start_line..=span.end_line, replacement);
}

/// Renders text as a triple-quoted literal. Short single-line texts stay
/// on one line; everything else gets one content line per text line,
/// indented to the original statement, with the closing quotes on their
/// own line. Embedded `"""` is escaped.
fn quote_docstring(text: &str, indent: &str) -> Vec<String> {
    let escaped = text.replace("\"\"\"", "\\\"\\\"\\\"");
    if !escaped.contains('\n') && escaped.len() <= SINGLE_LINE_LIMIT {
        return vec![format!("\"\"\"{escaped}\"\"\"")];
    }

    let mut out = vec!["\"\"\"".to_string()];
    for line in escaped.lines() {
        if line.is_empty() {
            out.push(String::new());
        } else {
            out.push(format!("{indent}{line}"));
        }
    }
    out.push(format!("{indent}\"\"\""));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_quotes_on_one_line() {
        assert_eq!(quote_docstring("Does a thing.", "    "), vec![
            "\"\"\"Does a thing.\"\"\"".to_string()
        ]);
    }

    #[test]
    fn long_text_quotes_multi_line() {
        let quoted = quote_docstring("First line.\n\nDetails here.", "    ");
        assert_eq!(
            quoted,
            vec![
                "\"\"\"".to_string(),
                "    First line.".to_string(),
                String::new(),
                "    Details here.".to_string(),
                "    \"\"\"".to_string(),
            ]
        );
    }

    #[test]
    fn embedded_triple_quotes_are_escaped() {
        let quoted = quote_docstring("has \"\"\" inside", "");
        assert_eq!(quoted, vec!["\"\"\"has \\\"\\\"\\\" inside\"\"\"".to_string()]);
    }
}
