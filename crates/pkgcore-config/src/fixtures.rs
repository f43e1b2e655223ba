// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Configurables and helpers shared by the unit tests.

use crate::configurable::{Arg, Configurable, Instance, Registry, Signature};
use crate::hint::ConfigHint;
use crate::manager::{ConfigManager, ConfigSource};
use crate::section::DictSection;
use crate::types::{TypeTag, Value};

pub const REPO: &str = "tests.fixtures.repo";
pub const DRAWER: &str = "tests.fixtures.drawer";
pub const SEQ: &str = "tests.fixtures.seq";
pub const TEXT: &str = "tests.fixtures.text";

#[derive(Debug, PartialEq)]
pub struct Repo {
    pub cache: String,
}

#[derive(Debug)]
pub struct Drawer {
    pub content: Option<Instance>,
    pub contents: Vec<Instance>,
}

#[derive(Debug, PartialEq)]
pub struct Seq(pub Vec<String>);

#[derive(Debug, PartialEq)]
pub struct Text(pub String);

pub fn repo() -> Configurable {
    Configurable::new(REPO, Signature::new().required("cache"), |args| {
        Ok(Some(Instance::new(Repo {
            cache: args.str("cache")?.to_string(),
        })))
    })
    .with_hint(ConfigHint::new().typename("repo"))
}

pub fn drawer() -> Configurable {
    let hint = ConfigHint::new()
        .typename("drawer")
        .with_type("content", TypeTag::Ref("drawer".into()))
        .with_type("contents", TypeTag::Refs("drawer".into()))
        .authorative(true);
    Configurable::opaque(DRAWER, |args| {
        let content = match args.get("content") {
            Some(Arg::Instance(instance)) => Some(instance.clone()),
            _ => None,
        };
        let contents = match args.get("contents") {
            Some(Arg::Instances(instances)) => instances.clone(),
            _ => Vec::new(),
        };
        Ok(Some(Instance::new(Drawer { content, contents })))
    })
    .with_hint(hint)
}

pub fn seq() -> Configurable {
    Configurable::new(
        SEQ,
        Signature::new().optional("seq", Value::List(vec![])),
        |args| Ok(Some(Instance::new(Seq(args.list("seq")?.clone())))),
    )
    .with_hint(ConfigHint::new().typename("seq"))
}

pub fn text() -> Configurable {
    Configurable::new(TEXT, Signature::new().optional("text", ""), |args| {
        Ok(Some(Instance::new(Text(args.str("text")?.to_string()))))
    })
    .with_hint(ConfigHint::new().typename("text"))
}

/// Builtins plus every fixture configurable.
pub fn registry() -> Registry {
    let mut registry = Registry::with_builtins();
    registry.register(repo());
    registry.register(drawer());
    registry.register(seq());
    registry.register(text());
    registry
}

pub fn strings(pairs: &[(&str, &str)]) -> DictSection {
    DictSection::strings(pairs.iter().copied())
}

pub fn source(sections: Vec<(&str, DictSection)>) -> ConfigSource {
    let mut source = ConfigSource::new();
    for (name, section) in sections {
        source.insert(name, section);
    }
    source
}

pub fn manager(sources: Vec<ConfigSource>) -> ConfigManager {
    ConfigManager::new(registry(), sources).expect("manager should load")
}
