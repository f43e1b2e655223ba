// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

use rstest::rstest;

use super::*;
use crate::basics::{section_alias, SECTION_ALIAS};
use crate::fixtures;
use crate::parsers::dhcp;

#[rstest]
#[case("plain", "\"plain\"")]
#[case("two words", "\"two words\"")]
#[case("say \"hi\"", "\"say \\\"hi\\\"\"")]
#[case("back\\slash", "\"back\\\\slash\"")]
fn test_quote(#[case] word: &str, #[case] expected: &str) {
    assert_eq!(quote(word), expected);
}

#[rstest]
fn test_describe_type() {
    let config_type = ConfigType::new(Rc::new(fixtures::repo())).unwrap();
    assert_eq!(describe_type(&config_type), "typename is repo\n\ncache: str (required)\n");

    let parser = ConfigType::new(Rc::new(dhcp::configurable())).unwrap();
    let described = describe_type(&parser);
    assert!(described.starts_with("typename is config_from_file\n"), "{described}");
    assert!(described.contains("Parse configuration text"), "{described}");
    assert!(described.contains("text: str (required)\norigin: str\n"), "{described}");
}

#[rstest]
fn test_dump_collapsed() {
    let m = fixtures::manager(vec![fixtures::source(vec![(
        "r",
        fixtures::strings(&[("class", fixtures::REPO), ("cache", "warm")]),
    )])]);
    let collapsed = m.collapse_named_section("r").unwrap();
    let expected = format!(
        "\"r\" {{
    # typename of this section: repo
    class {};
    # type: str
    cache \"warm\";
}}
",
        fixtures::REPO
    );
    assert_eq!(dump_collapsed("r", &collapsed).unwrap(), expected);
}

#[rstest]
fn test_dump_collapsed_nested_reparses() {
    let text = format!(
        "outer {{ class {d}; content {{ class {d}; }}; contents named {{ class {d}; }}; }}
named {{ class {d}; }}",
        d = fixtures::DRAWER
    );
    let m = fixtures::manager(vec![dhcp::config_from_str(&text, "test").unwrap()]);
    let collapsed = m.collapse_named_section("outer").unwrap();
    let dumped = dump_collapsed("outer", &collapsed).unwrap();
    let expected = format!(
        "\"outer\" {{
    # typename of this section: drawer
    class {d};
    # type: ref:drawer
    content {{
        # typename of this section: drawer
        class {d};
    }};
    # type: refs:drawer
    contents \"named\" {{
        # typename of this section: drawer
        class {d};
    }};
}}
",
        d = fixtures::DRAWER
    );
    assert_eq!(dumped, expected);

    let reparsed = dhcp::config_from_str(&dumped, "dump").unwrap();
    let m = fixtures::manager(vec![
        reparsed,
        dhcp::config_from_str(&format!("named {{ class {}; }}", fixtures::DRAWER), "n").unwrap(),
    ]);
    let again = m.collapse_named_section("outer").unwrap();
    assert_eq!(dump_collapsed("outer", &again).unwrap(), dumped);
}

#[rstest]
fn test_dump_uncollapsed() {
    let m = fixtures::manager(vec![]);
    let section = fixtures::strings(&[
        ("class", fixtures::SEQ),
        ("seq.prepend", "a"),
        ("seq", "b c"),
    ]);
    let expected = format!(
        "\"s\" {{
    # type: str
    class \"{}\";
    # type: str
    seq.prepend \"a\";
    seq \"b c\";
}}
",
        fixtures::SEQ
    );
    assert_eq!(dump_uncollapsed(&m, "s", &section).unwrap(), expected);
}

#[rstest]
fn test_dump_uncollapsed_inline_section() {
    let text = format!("outer {{ content {{ class {}; }}; flag yes; }}", fixtures::DRAWER);
    let source = dhcp::config_from_str(&text, "test").unwrap();
    let m = fixtures::manager(vec![]);
    let outer = source.get("outer").unwrap();
    let dumped = dump_uncollapsed(&m, "outer", outer.as_ref()).unwrap();
    let expected = format!(
        "\"outer\" {{
    # type: ref
    content {{
        # type: str
        class \"{}\";
    }};
    # type: str
    flag \"yes\";
}}
",
        fixtures::DRAWER
    );
    assert_eq!(dumped, expected);
}

#[rstest]
fn test_referenced_classes() {
    let text = format!(
        "outer {{ class {d}; content {{ class {seq}; }}; }}",
        d = fixtures::DRAWER,
        seq = fixtures::SEQ
    );
    let mut inline = dhcp::config_from_str(&text, "test").unwrap();
    inline.insert("alias", section_alias("outer", "drawer"));
    let m = fixtures::manager(vec![
        inline,
        fixtures::source(vec![("r", fixtures::strings(&[("class", fixtures::REPO)]))]),
    ]);
    let classes: Vec<String> = referenced_classes(&m).unwrap().into_iter().collect();
    let mut expected = vec![
        fixtures::DRAWER.to_string(),
        fixtures::SEQ.to_string(),
        fixtures::REPO.to_string(),
        SECTION_ALIAS.to_string(),
    ];
    expected.sort();
    assert_eq!(classes, expected);
}
