//! Codec for the XML-like dump interchange format.
//!
//! A dump is one `<dump>` root holding one element per entry, tagged by
//! kind (`<module>`, `<class>`, `<callable>`, `<object>`, `<dir>`,
//! `<file>`). Identity and source metadata ride in attributes; base-type
//! references and alias edges are nested `<base ref=…/>` and
//! `<ref name=… ref=…/>` children; the entry text is the escaped element
//! body. The format is line-oriented enough to diff, but the parser does
//! not care about formatting whitespace.

use docweb_types::{CanonicalName, Dump, DumpEntry, DumpRef, EntryKind};
use std::fmt::Write as _;
use thiserror::Error;

/// Errors produced while parsing a dump.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input at line {line}")]
    UnexpectedEof { line: usize },

    #[error("expected {expected} at line {line}")]
    Unexpected { expected: String, line: usize },

    #[error("unknown element <{tag}> at line {line}")]
    UnknownElement { tag: String, line: usize },

    #[error("missing required attribute {attr:?} on <{tag}> at line {line}")]
    MissingAttribute {
        tag: String,
        attr: &'static str,
        line: usize,
    },

    #[error("invalid value {value:?} for attribute {attr:?} at line {line}")]
    InvalidAttribute {
        attr: &'static str,
        value: String,
        line: usize,
    },
}

// ── Text escaping ────────────────────────────────────────────────

/// Escapes entry text for transport: markup characters become entities,
/// control characters become backslash escapes, so the body survives as
/// a single physical line.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Decodes escaped entry text. Lenient by design: malformed escape
/// sequences are kept literally, unknown entities pass through, and
/// `\xNN` bytes at or above 0x80 decode as Latin-1. Dumps come from
/// external extractors and a stray byte must not sink the whole pass.
#[must_use]
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('r') => {
                    chars.next();
                    out.push('\r');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                Some('x') => {
                    let rest: String = chars.clone().skip(1).take(2).collect();
                    match u32::from_str_radix(&rest, 16) {
                        Ok(code) if rest.len() == 2 => {
                            // Latin-1 fallback for high bytes; chars 0-0xff
                            // map directly to the same scalar values.
                            chars.next();
                            chars.next();
                            chars.next();
                            out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        _ => out.push('\\'),
                    }
                }
                _ => out.push('\\'),
            },
            '&' => {
                let rest: String = chars.clone().take(5).collect();
                let entity = [("amp;", '&'), ("lt;", '<'), ("gt;", '>'), ("quot;", '"')]
                    .iter()
                    .find(|(name, _)| rest.starts_with(name))
                    .copied();
                match entity {
                    Some((name, decoded)) => {
                        for _ in 0..name.len() {
                            chars.next();
                        }
                        out.push(decoded);
                    }
                    None => out.push('&'),
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Entity-only decoding for attribute values; backslashes in attribute
/// values (file paths) are literal.
fn unescape_attr(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

// ── Serialization ────────────────────────────────────────────────

/// Serializes a dump to its interchange text form.
#[must_use]
pub fn serialize_dump(dump: &Dump) -> String {
    let mut out = String::from("<dump>\n");
    for entry in dump.entries() {
        serialize_entry(&mut out, entry);
    }
    out.push_str("</dump>\n");
    out
}

fn serialize_entry(out: &mut String, entry: &DumpEntry) {
    let tag = entry.kind.as_str();
    let _ = write!(out, "<{} id=\"{}\"", tag, escape_attr(entry.name.as_str()));
    for (attr, value) in [
        ("type", &entry.type_name),
        ("argspec", &entry.arg_spec),
        ("objclass", &entry.owner_class),
        ("file", &entry.file_path),
    ] {
        if let Some(value) = value {
            let _ = write!(out, " {}=\"{}\"", attr, escape_attr(value));
        }
    }
    if let Some(line) = entry.line_number {
        let _ = write!(out, " line=\"{line}\"");
    }

    let bodyless =
        entry.text.is_empty() && entry.base_types.is_empty() && entry.refs.is_empty();
    if bodyless {
        out.push_str("/>\n");
        return;
    }

    out.push_str(">\n");
    for base in &entry.base_types {
        let _ = writeln!(out, "<base ref=\"{}\"/>", escape_attr(base.as_str()));
    }
    for r in &entry.refs {
        let _ = write!(
            out,
            "<ref name=\"{}\" ref=\"{}\"",
            escape_attr(&r.local_name),
            escape_attr(r.target.as_str())
        );
        if let Some(in_all) = r.in_all {
            let _ = write!(out, " in-all=\"{}\"", if in_all { "1" } else { "0" });
        }
        out.push_str("/>\n");
    }
    let _ = writeln!(out, "{}</{}>", escape_text(&entry.text), tag);
}

// ── Parsing ──────────────────────────────────────────────────────

/// Parses a dump from its interchange text form.
pub fn parse_dump(input: &str) -> Result<Dump, CodecError> {
    let mut scanner = Scanner::new(input);
    let mut dump = Dump::new();

    scanner.skip_whitespace();
    scanner.expect_literal("<dump>")?;
    loop {
        scanner.skip_whitespace();
        if scanner.try_literal("</dump>") {
            break;
        }
        dump.push(parse_entry(&mut scanner)?);
    }
    scanner.skip_whitespace();
    if !scanner.at_end() {
        return Err(scanner.unexpected("end of input"));
    }
    Ok(dump)
}

fn parse_entry(scanner: &mut Scanner<'_>) -> Result<DumpEntry, CodecError> {
    let open_line = scanner.line;
    scanner.expect_char('<')?;
    let tag = scanner.read_name()?;
    let kind: EntryKind = tag.parse().map_err(|_| CodecError::UnknownElement {
        tag: tag.clone(),
        line: open_line,
    })?;

    let (attrs, self_closed) = parse_attributes(scanner)?;
    let mut entry = DumpEntry::new(
        require_attr(&attrs, &tag, "id", open_line)?,
        kind,
    );
    entry.type_name = find_attr(&attrs, "type");
    entry.arg_spec = find_attr(&attrs, "argspec");
    entry.owner_class = find_attr(&attrs, "objclass");
    entry.file_path = find_attr(&attrs, "file");
    entry.line_number = match find_attr(&attrs, "line") {
        Some(raw) => Some(raw.parse().map_err(|_| CodecError::InvalidAttribute {
            attr: "line",
            value: raw.clone(),
            line: open_line,
        })?),
        None => None,
    };

    if self_closed {
        return Ok(entry);
    }

    let mut body = String::new();
    loop {
        body.push_str(scanner.read_text_segment()?);
        let child_line = scanner.line;
        if scanner.try_literal("</") {
            let close = scanner.read_name()?;
            if close != tag {
                return Err(CodecError::Unexpected {
                    expected: format!("</{tag}>"),
                    line: child_line,
                });
            }
            scanner.expect_char('>')?;
            break;
        }
        scanner.expect_char('<')?;
        let child = scanner.read_name()?;
        let (child_attrs, closed) = parse_attributes(scanner)?;
        if !closed {
            return Err(CodecError::Unexpected {
                expected: format!("self-closing <{child}/>"),
                line: child_line,
            });
        }
        match child.as_str() {
            "base" => {
                let target = require_attr(&child_attrs, "base", "ref", child_line)?;
                entry.base_types.push(CanonicalName::new(target));
            }
            "ref" => {
                let local_name = require_attr(&child_attrs, "ref", "name", child_line)?;
                let target = require_attr(&child_attrs, "ref", "ref", child_line)?;
                let in_all = match find_attr(&child_attrs, "in-all") {
                    None => None,
                    Some(raw) => Some(parse_flag(&raw).ok_or(CodecError::InvalidAttribute {
                        attr: "in-all",
                        value: raw.clone(),
                        line: child_line,
                    })?),
                };
                entry.refs.push(DumpRef {
                    local_name,
                    target: CanonicalName::new(target),
                    in_all,
                });
            }
            other => {
                return Err(CodecError::UnknownElement {
                    tag: other.to_string(),
                    line: child_line,
                })
            }
        }
    }
    entry.text = unescape_text(body.trim());
    Ok(entry)
}

fn parse_attributes(
    scanner: &mut Scanner<'_>,
) -> Result<(Vec<(String, String)>, bool), CodecError> {
    let mut attrs = Vec::new();
    loop {
        scanner.skip_whitespace();
        if scanner.try_literal("/>") {
            return Ok((attrs, true));
        }
        if scanner.try_literal(">") {
            return Ok((attrs, false));
        }
        let name = scanner.read_name()?;
        scanner.expect_char('=')?;
        let value = scanner.read_quoted()?;
        attrs.push((name, unescape_attr(&value)));
    }
}

fn find_attr(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
}

fn require_attr(
    attrs: &[(String, String)],
    tag: &str,
    attr: &'static str,
    line: usize,
) -> Result<String, CodecError> {
    find_attr(attrs, attr).ok_or_else(|| CodecError::MissingAttribute {
        tag: tag.to_string(),
        attr,
        line,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Minimal cursor over the input with line tracking for diagnostics.
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn advance(&mut self, len: usize) {
        let consumed = &self.input[self.pos..self.pos + len];
        self.line += consumed.matches('\n').count();
        self.pos += len;
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        let len = self.rest().len() - trimmed.len();
        self.advance(len);
    }

    fn try_literal(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.advance(literal.len());
            true
        } else {
            false
        }
    }

    fn expect_literal(&mut self, literal: &str) -> Result<(), CodecError> {
        if self.try_literal(literal) {
            Ok(())
        } else {
            Err(self.unexpected(literal))
        }
    }

    fn expect_char(&mut self, c: char) -> Result<(), CodecError> {
        match self.rest().chars().next() {
            Some(found) if found == c => {
                self.advance(c.len_utf8());
                Ok(())
            }
            Some(_) => Err(self.unexpected(&c.to_string())),
            None => Err(CodecError::UnexpectedEof { line: self.line }),
        }
    }

    /// Tag or attribute name: ASCII alphanumerics plus `-` and `_`.
    fn read_name(&mut self) -> Result<String, CodecError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.unexpected("a name"));
        }
        let name = rest[..len].to_string();
        self.advance(len);
        Ok(name)
    }

    /// A double-quoted attribute value (raw; entity-decoded by the caller).
    fn read_quoted(&mut self) -> Result<String, CodecError> {
        self.expect_char('"')?;
        let rest = self.rest();
        let end = rest
            .find('"')
            .ok_or(CodecError::UnexpectedEof { line: self.line })?;
        let value = rest[..end].to_string();
        self.advance(end + 1);
        Ok(value)
    }

    /// Raw element body up to the next markup character.
    fn read_text_segment(&mut self) -> Result<&'a str, CodecError> {
        let rest = self.rest();
        let end = rest
            .find('<')
            .ok_or(CodecError::UnexpectedEof { line: self.line })?;
        let segment = &rest[..end];
        self.advance(end);
        Ok(segment)
    }

    fn unexpected(&self, expected: &str) -> CodecError {
        if self.at_end() {
            CodecError::UnexpectedEof { line: self.line }
        } else {
            CodecError::Unexpected {
                expected: expected.to_string(),
                line: self.line,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_round_trips_control_characters() {
        let text = "line1\nline2\twith\\slash & <markup>\x07bell";
        assert_eq!(unescape_text(&escape_text(text)), text);
    }

    #[test]
    fn unescape_is_lenient_on_malformed_sequences() {
        assert_eq!(unescape_text("trailing\\"), "trailing\\");
        assert_eq!(unescape_text("bad\\xZZhex"), "bad\\xZZhex");
        assert_eq!(unescape_text("unknown &entity;"), "unknown &entity;");
    }

    #[test]
    fn high_bytes_decode_as_latin1() {
        assert_eq!(unescape_text("caf\\xe9"), "café");
    }
}
