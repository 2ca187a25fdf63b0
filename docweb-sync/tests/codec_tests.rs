//! Dump codec round-trips and malformed-input handling.

use docweb_sync::codec::{parse_dump, serialize_dump};
use docweb_sync::CodecError;
use docweb_types::{CanonicalName, Dump, DumpEntry, DumpRef, EntryKind};
use pretty_assertions::assert_eq;

fn sample_dump() -> Dump {
    let mut dump = Dump::new();
    dump.push(
        DumpEntry::new("pkg", EntryKind::Module)
            .with_text("Package docstring.\n\nSecond paragraph.")
            .with_location("pkg/__init__.py", 1),
    );
    let mut klass = DumpEntry::new("pkg.Klass", EntryKind::Class)
        .with_text("A class with <angle> & special chars.")
        .with_location("pkg/mod.py", 10);
    klass.type_name = Some("type".to_string());
    klass.base_types.push(CanonicalName::new("object"));
    dump.push(klass);
    let mut func = DumpEntry::new("pkg.Klass.method", EntryKind::Callable);
    func.arg_spec = Some("(self, x)".to_string());
    func.owner_class = Some("pkg.Klass".to_string());
    dump.push(func);
    let mut module = DumpEntry::new("pkg.mod", EntryKind::Module);
    module.refs.push(DumpRef {
        local_name: "Klass".to_string(),
        target: CanonicalName::new("pkg.Klass"),
        in_all: Some(true),
    });
    dump.push(module);
    dump.push(DumpEntry::new("doc", EntryKind::Directory));
    dump.push(DumpEntry::new("doc/index.rst", EntryKind::File).with_text("Title\n=====\n\nbody"));
    dump
}

#[test]
fn serialize_parse_round_trip() {
    let dump = sample_dump();
    let text = serialize_dump(&dump);
    let parsed = parse_dump(&text).unwrap();
    assert_eq!(parsed, dump);
}

#[test]
fn parses_minimal_dump() {
    let text = r#"<dump>
<callable id="pkg.f" argspec="(x)" file="pkg.py" line="3">
docstring\nline two</callable>
<dir id="doc"/>
</dump>
"#;
    let dump = parse_dump(text).unwrap();
    assert_eq!(dump.len(), 2);

    let f = dump.get(&CanonicalName::new("pkg.f")).unwrap();
    assert_eq!(f.kind, EntryKind::Callable);
    assert_eq!(f.arg_spec.as_deref(), Some("(x)"));
    assert_eq!(f.line_number, Some(3));
    assert_eq!(f.text, "docstring\nline two");

    let d = dump.get(&CanonicalName::new("doc")).unwrap();
    assert_eq!(d.kind, EntryKind::Directory);
    assert_eq!(d.text, "");
}

#[test]
fn formatting_whitespace_is_insignificant() {
    let compact = "<dump><object id=\"a.b\">text</object></dump>";
    let spaced = "<dump>\n\n  <object id=\"a.b\" >\ntext</object>\n</dump>\n";
    assert_eq!(parse_dump(compact).unwrap(), parse_dump(spaced).unwrap());
}

#[test]
fn missing_id_is_rejected() {
    let err = parse_dump("<dump><module type=\"t\"/></dump>").unwrap_err();
    assert!(matches!(
        err,
        CodecError::MissingAttribute { attr: "id", .. }
    ));
}

#[test]
fn unknown_kind_is_rejected() {
    let err = parse_dump("<dump><widget id=\"x\"/></dump>").unwrap_err();
    assert!(matches!(err, CodecError::UnknownElement { .. }));
}

#[test]
fn bad_line_attribute_is_rejected() {
    let err = parse_dump("<dump><module id=\"m\" line=\"ten\"/></dump>").unwrap_err();
    assert!(matches!(
        err,
        CodecError::InvalidAttribute { attr: "line", .. }
    ));
}

#[test]
fn truncated_input_is_rejected() {
    let err = parse_dump("<dump>\n<module id=\"m\">\ntext").unwrap_err();
    assert!(matches!(err, CodecError::UnexpectedEof { .. }));
}

#[test]
fn mismatched_close_tag_is_rejected() {
    let err = parse_dump("<dump><module id=\"m\">text</class></dump>").unwrap_err();
    assert!(matches!(err, CodecError::Unexpected { .. }));
}
