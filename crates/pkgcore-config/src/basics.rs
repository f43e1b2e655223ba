// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Built-in configurables.

use std::path::Path;
use std::rc::Rc;

use crate::configurable::{Arg, Arguments, Configurable, Registry};
use crate::error::Error;
use crate::hint::ConfigHint;
use crate::loader::read_source;
use crate::parsers;
use crate::section::DictSection;
use crate::types::{TypeTag, Value};
use crate::CONFIGSECTION_TYPENAME;

#[cfg(test)]
#[path = "./basics_test.rs"]
mod basics_test;

pub const PARSE_CONFIG_FILE: &str = "pkgcore.config.basics.parse_config_file";
pub const SECTION_ALIAS: &str = "pkgcore.config.basics.section_alias";

/// Register every built-in configurable.
pub fn register_builtins(registry: &mut Registry) {
    registry.register(parse_config_file());
    registry.register(parsers::ini::configurable());
    registry.register(parsers::dhcp::configurable());
    registry.register(parsers::mke2fs::configurable());
}

/// `configsection` that reads `path` and hands its text to `parser`.
///
/// The parser is called with the text as its first positional argument and
/// the path as `origin`.
pub fn parse_config_file() -> Configurable {
    let hint = ConfigHint::new()
        .with_type("path", TypeTag::Str)
        .with_type("parser", TypeTag::Callable)
        .required(["path", "parser"])
        .positional(["path", "parser"])
        .typename(CONFIGSECTION_TYPENAME)
        .doc("Read a configuration file with the given parser.")
        .authorative(true);

    Configurable::opaque(PARSE_CONFIG_FILE, |args| {
        let path = args.str("path")?;
        let parser = args.callable("parser")?;
        let text = read_source(Path::new(path))?;

        let mut parser_args = Arguments::new();
        parser_args.push_positional("text", Arg::Str(text));
        parser_args.insert("origin", Arg::Str(path.to_string()));
        match parser.call(parser_args)? {
            Some(source) => Ok(Some(source)),
            None => Err(Error::configuration(format!(
                "parser {} returned nothing for {path:?}",
                parser.name()
            ))
            .into()),
        }
    })
    .with_hint(hint)
}

/// A section that resolves to the instance of another section.
///
/// Collapsed sections are cached by the manager, so the alias instantiates
/// to the very same object as `target`.
pub fn section_alias(target: &str, typename: &str) -> DictSection {
    let hint = ConfigHint::new()
        .with_type("target", TypeTag::Ref(typename.to_string()))
        .required(["target"])
        .typename(typename)
        .authorative(true);
    let alias = Configurable::opaque(SECTION_ALIAS, |args| {
        Ok(Some(args.instance("target")?.clone()))
    })
    .with_hint(hint);

    DictSection::hybrid([
        ("class", Value::Callable(Rc::new(alias))),
        ("target", Value::Str(target.to_string())),
    ])
}
