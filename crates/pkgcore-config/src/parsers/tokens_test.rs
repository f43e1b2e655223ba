// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

use rstest::rstest;

use super::*;
use crate::fixtures;
use crate::manager::ConfigSource;
use crate::section::Repr;
use crate::types::ValueKind;
use crate::{ErrorKind, Registry};

fn words(tokens: &[Token]) -> Vec<&str> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Word(w) => Some(w.as_str()),
            Token::Block(_) => None,
        })
        .collect()
}

fn empty_manager() -> ConfigManager {
    ConfigManager::new(Registry::new(), []).unwrap()
}

#[rstest]
fn test_dhcp_sections() {
    let text = r#"
# leading comment
first {
    key value;
    multi one "two words" 'three';
    nested { inner yes; };
}
second { trailing no }
"#;
    let sections = parse_sections(text, "test", Dialect::Dhcp).unwrap();
    assert_eq!(sections.keys().collect::<Vec<_>>(), ["first", "second"]);

    let first = &sections["first"];
    assert_eq!(words(first.get("key").unwrap()), ["value"]);
    assert_eq!(
        words(first.get("multi").unwrap()),
        ["one", "two words", "three"]
    );
    match first.get("nested").unwrap() {
        [Token::Block(block)] => assert_eq!(words(block.get("inner").unwrap()), ["yes"]),
        other => panic!("expected a single block, got {other:?}"),
    }
    assert_eq!(words(sections["second"].get("trailing").unwrap()), ["no"]);
}

#[rstest]
fn test_mke2fs_sections() {
    let text = "
[first]
    key = value
    multi = one two
    nested = {
        inner = yes
    }
[second]
    other = 1
";
    let sections = parse_sections(text, "test", Dialect::Mke2fs).unwrap();
    assert_eq!(sections.keys().collect::<Vec<_>>(), ["first", "second"]);
    let first = &sections["first"];
    assert_eq!(words(first.get("key").unwrap()), ["value"]);
    assert_eq!(words(first.get("multi").unwrap()), ["one", "two"]);
    match first.get("nested").unwrap() {
        [Token::Block(block)] => assert_eq!(words(block.get("inner").unwrap()), ["yes"]),
        other => panic!("expected a single block, got {other:?}"),
    }
    assert_eq!(words(sections["second"].get("other").unwrap()), ["1"]);
}

#[rstest]
#[case::dhcp_unterminated(Dialect::Dhcp, "a { key value;", "unterminated block")]
#[case::dhcp_duplicate_section(Dialect::Dhcp, "a { x 1; }\na { y 2; }", "section \"a\" already exists")]
#[case::dhcp_duplicate_key(Dialect::Dhcp, "a { x 1; x 2; }", "option \"x\" already exists")]
#[case::dhcp_no_value(Dialect::Dhcp, "a { x; }", "\"x\" has no value")]
#[case::dhcp_no_brace(Dialect::Dhcp, "a x;", "expected '{'")]
#[case::quote(Dialect::Dhcp, "a { x \"open; }", "unterminated quoted string")]
#[case::mke2fs_no_equals(Dialect::Mke2fs, "[a]\nx 1\n", "expected '='")]
#[case::mke2fs_no_header(Dialect::Mke2fs, "x = 1\n", "expected '['")]
#[case::mke2fs_unterminated(Dialect::Mke2fs, "[a]\nx = {\ny = 1\n", "unterminated block")]
fn test_parse_errors(#[case] dialect: Dialect, #[case] text: &str, #[case] expected: &str) {
    let err = parse_sections(text, "bad", dialect).unwrap_err();
    match err.kind() {
        ErrorKind::Parsing {
            origin, message, ..
        } => {
            assert_eq!(origin, "bad");
            assert!(message.contains(expected), "{message}");
        }
        other => panic!("expected a parsing error, got {other:?}"),
    }
}

#[rstest]
fn test_error_line_numbers() {
    let err = parse_sections("a {\n  x 1;\n  x 2;\n}\n", "bad", Dialect::Dhcp).unwrap_err();
    match err.kind() {
        ErrorKind::Parsing { line, .. } => assert_eq!(*line, Some(3)),
        other => panic!("expected a parsing error, got {other:?}"),
    }
}

#[rstest]
fn test_render_types() {
    let sections = parse_sections(
        "a { s word; l one two; b yes; i 12; r target; blk { x 1; }; }",
        "test",
        Dialect::Dhcp,
    )
    .unwrap();
    let section = &sections["a"];
    let m = empty_manager();

    let value = |key: &str, ty: TypeTag| section.render_value(&m, key, &ty).unwrap();
    match value("s", TypeTag::Str).into_value().unwrap() {
        ConfigValue::Str(s) => assert_eq!(s, "word"),
        other => panic!("unexpected {other:?}"),
    }
    match value("l", TypeTag::List).into_value().unwrap() {
        ConfigValue::List(l) => assert_eq!(l, ["one", "two"]),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        value("b", TypeTag::Bool).into_value().unwrap(),
        ConfigValue::Bool(true)
    ));
    assert!(matches!(
        value("i", TypeTag::Int).into_value().unwrap(),
        ConfigValue::Int(12)
    ));
    match value("r", TypeTag::Ref("repo".into())).into_value().unwrap() {
        ConfigValue::LazyRef(r) => assert_eq!(r.name(), Some("target")),
        other => panic!("unexpected {other:?}"),
    }
    match value("blk", TypeTag::Ref("repo".into())).into_value().unwrap() {
        ConfigValue::LazyRef(r) => assert_eq!(r.name(), None),
        other => panic!("unexpected {other:?}"),
    }
}

#[rstest]
fn test_render_errors() {
    let sections =
        parse_sections("a { two one two; blk { x 1; }; }", "test", Dialect::Dhcp).unwrap();
    let section = &sections["a"];
    let m = empty_manager();

    let err = section.render_value(&m, "two", &TypeTag::Bool).unwrap_err();
    assert!(err.to_string().contains("only one argument required"), "{err}");
    assert!(err.to_string().contains("Converting argument \"two\" to bool"), "{err}");

    let err = section.render_value(&m, "blk", &TypeTag::List).unwrap_err();
    assert!(err.to_string().contains("need a string, not a section"), "{err}");

    let err = section.render_value(&m, "missing", &TypeTag::Str).unwrap_err();
    assert!(err.to_string().contains("\"missing\" not found"), "{err}");
}

#[rstest]
fn test_incremental_parts_and_keys() {
    let sections = parse_sections(
        "a { seq.prepend first; seq middle; seq.append last; }",
        "test",
        Dialect::Dhcp,
    )
    .unwrap();
    let section = &sections["a"];
    assert!(section.contains("seq"));
    assert_eq!(section.keys(), ["seq"]);

    let m = empty_manager();
    let parts = section
        .render_value(&m, "seq", &TypeTag::List)
        .unwrap()
        .into_parts()
        .unwrap();
    let list = |v: Option<ConfigValue>| match v {
        Some(ConfigValue::List(l)) => l,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(list(parts.prepend), ["first"]);
    assert_eq!(list(parts.base), ["middle"]);
    assert_eq!(list(parts.append), ["last"]);
}

#[rstest]
fn test_repr() {
    let sections = parse_sections(
        "a { s word; l one two; blk { x 1; }; mixed name { y 2; }; }",
        "test",
        Dialect::Dhcp,
    )
    .unwrap();
    let section = &sections["a"];
    let m = empty_manager();
    let repr = |key: &str| {
        section
            .render_value(&m, key, &TypeTag::Repr)
            .unwrap()
            .into_repr()
            .unwrap()
    };

    assert!(matches!(repr("s"), Repr::Parts(ValueKind::Str, _)));
    assert!(matches!(repr("l"), Repr::Parts(ValueKind::List, _)));
    assert!(matches!(repr("blk"), Repr::Value(Value::Ref(SectionRef::Inline(_)))));
    match repr("mixed") {
        Repr::Parts(ValueKind::Refs, parts) => match parts.base {
            Some(Value::Refs(refs)) => {
                assert_eq!(refs.len(), 2);
                assert!(matches!(&refs[0], SectionRef::Named(n) if n == "name"));
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[rstest]
fn test_anonymous_block_instantiates() {
    let text = format!(
        "outer {{ class {drawer}; content {{ class {drawer}; }}; }}",
        drawer = fixtures::DRAWER
    );
    let mut source = ConfigSource::new();
    for (name, section) in parse_sections(&text, "test", Dialect::Dhcp).unwrap() {
        source.insert(name, section);
    }
    let m = fixtures::manager(vec![source]);
    let outer = m.objects("drawer").get("outer").unwrap().unwrap();
    let outer = outer.downcast_ref::<fixtures::Drawer>().unwrap();
    assert!(outer.content.is_some());
}
