// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Text renderings of types, collapsed sections and raw sections.
//!
//! Section dumps use the dhcpd-style syntax, so a dump of plain values can
//! be read back by [`crate::parsers::dhcp`].

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::collapse::CollapsedConfig;
use crate::error::{ErrorContext, Result};
use crate::hint::ConfigType;
use crate::lazy_ref::LazyRef;
use crate::manager::ConfigManager;
use crate::section::{Parts, Repr, Section, APPEND_SUFFIX, PREPEND_SUFFIX};
use crate::types::{ConfigValue, SectionRef, TypeTag, Value};

#[cfg(test)]
#[path = "./dump_test.rs"]
mod dump_test;

const INDENT: &str = "    ";

#[derive(Default)]
struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn open(&mut self, header: impl AsRef<str>) {
        self.line(format!("{} {{", header.as_ref()));
        self.depth += 1;
    }

    fn close(&mut self, footer: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(format!("}}{footer}"));
    }
}

/// Quote a word so the dhcp tokenizer reads it back unchanged.
pub fn quote(word: &str) -> String {
    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('"');
    for c in word.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Human readable description of a configurable's parameters.
pub fn describe_type(config_type: &ConfigType) -> String {
    let mut out = format!("typename is {}\n", config_type.name);
    if let Some(doc) = &config_type.doc {
        out.push('\n');
        out.push_str(doc.trim());
        out.push('\n');
    }
    if config_type.allow_unknowns {
        out.push_str("\nvalues not listed are handled as strings\n");
    }
    if !config_type.types.is_empty() {
        out.push('\n');
    }
    for (name, ty) in &config_type.types {
        let required = if config_type.required.contains(name) {
            " (required)"
        } else {
            ""
        };
        out.push_str(&format!("{name}: {ty}{required}\n"));
    }
    out
}

/// Dump a collapsed section, expanding anonymous references inline.
pub fn dump_collapsed(name: &str, config: &CollapsedConfig) -> Result<String> {
    let mut writer = Writer::default();
    writer.open(quote(name));
    write_collapsed(&mut writer, config)?;
    writer.close("");
    Ok(writer.out)
}

fn write_collapsed(writer: &mut Writer, config: &CollapsedConfig) -> Result<()> {
    let config_type = config.config_type();
    writer.line(format!("# typename of this section: {}", config_type.name));
    writer.line(format!("class {};", config_type.callable.name()));
    if config.is_default() {
        writer.line("default yes;");
    }
    for (key, value) in config.config() {
        if let Some(ty) = config_type.type_of(key) {
            writer.line(format!("# type: {ty}"));
        }
        write_config_value(writer, key, value)
            .with_context(|| format!("Dumping key {key:?}"))?;
    }
    Ok(())
}

enum Item<S> {
    Word(String),
    Section(S),
}

fn write_config_value(writer: &mut Writer, key: &str, value: &ConfigValue) -> Result<()> {
    let items: Vec<Item<Rc<CollapsedConfig>>> = match value {
        ConfigValue::Str(s) => vec![Item::Word(quote(s))],
        ConfigValue::Bool(b) => vec![Item::Word(bool_word(*b))],
        ConfigValue::Int(i) => vec![Item::Word(i.to_string())],
        ConfigValue::List(l) => l.iter().map(|s| Item::Word(quote(s))).collect(),
        ConfigValue::Callable(c) => vec![Item::Word(c.name().to_string())],
        ConfigValue::Ref(config) => vec![collapsed_item(config)],
        ConfigValue::Refs(configs) => configs.iter().map(collapsed_item).collect(),
        ConfigValue::LazyRef(reference) => vec![lazy_item(reference)?],
        ConfigValue::LazyRefs(references) => references
            .iter()
            .map(lazy_item)
            .collect::<Result<Vec<_>>>()?,
    };
    write_items(writer, key, items, |writer, config| write_collapsed(writer, config))
}

fn bool_word(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn collapsed_item(config: &Rc<CollapsedConfig>) -> Item<Rc<CollapsedConfig>> {
    match config.name() {
        Some(name) => Item::Word(quote(name)),
        None => Item::Section(Rc::clone(config)),
    }
}

fn lazy_item(reference: &LazyRef) -> Result<Item<Rc<CollapsedConfig>>> {
    match reference.name() {
        Some(name) => Ok(Item::Word(quote(name))),
        None => Ok(Item::Section(reference.collapse()?)),
    }
}

/// Write `key item...;`, opening a block for every nested section.
fn write_items<S, F>(writer: &mut Writer, key: &str, items: Vec<Item<S>>, mut nested: F) -> Result<()>
where
    F: FnMut(&mut Writer, &S) -> Result<()>,
{
    let mut current = key.to_string();
    for item in items {
        match item {
            Item::Word(word) => {
                current.push(' ');
                current.push_str(&word);
            }
            Item::Section(section) => {
                writer.open(&current);
                nested(writer, &section)?;
                writer.depth = writer.depth.saturating_sub(1);
                current = "}".to_string();
            }
        }
    }
    current.push(';');
    writer.line(current);
    Ok(())
}

/// Dump a section as written, before inheritance or conversion.
///
/// Incremental values are shown as their `.prepend`, base and `.append`
/// parts, each preceded by a comment naming the kind of value.
pub fn dump_uncollapsed(manager: &ConfigManager, name: &str, section: &dyn Section) -> Result<String> {
    let mut writer = Writer::default();
    writer.open(quote(name));
    write_uncollapsed(&mut writer, manager, section)?;
    writer.close("");
    Ok(writer.out)
}

fn write_uncollapsed(writer: &mut Writer, manager: &ConfigManager, section: &dyn Section) -> Result<()> {
    for key in section.keys() {
        let repr = section
            .render_value(manager, &key, &TypeTag::Repr)?
            .into_repr()
            .with_context(|| format!("Dumping key {key:?}"))?;
        match repr {
            Repr::Value(value) => {
                writer.line(format!("# type: {}", value.kind()));
                write_raw_value(writer, manager, &key, &value)?;
            }
            Repr::Parts(kind, Parts { prepend, base, append }) => {
                writer.line(format!("# type: {kind}"));
                let parts = [
                    (format!("{key}{PREPEND_SUFFIX}"), prepend),
                    (key.clone(), base),
                    (format!("{key}{APPEND_SUFFIX}"), append),
                ];
                for (name, value) in parts {
                    if let Some(value) = value {
                        write_raw_value(writer, manager, &name, &value)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn section_item(section: &SectionRef) -> Item<Rc<dyn Section>> {
    match section {
        SectionRef::Named(name) => Item::Word(quote(name)),
        SectionRef::Inline(section) => Item::Section(Rc::clone(section)),
    }
}

fn write_raw_value(writer: &mut Writer, manager: &ConfigManager, key: &str, value: &Value) -> Result<()> {
    let items: Vec<Item<Rc<dyn Section>>> = match value {
        Value::Str(s) => vec![Item::Word(quote(s))],
        Value::Bool(b) => vec![Item::Word(bool_word(*b))],
        Value::Int(i) => vec![Item::Word(i.to_string())],
        Value::List(l) => l.iter().map(|s| Item::Word(quote(s))).collect(),
        Value::Callable(c) => vec![Item::Word(c.name().to_string())],
        Value::Ref(section) => vec![section_item(section)],
        Value::Refs(sections) => sections.iter().map(section_item).collect(),
    };
    write_items(writer, key, items, |writer, section| {
        write_uncollapsed(writer, manager, section.as_ref())
    })
}

/// Every `class` named by the sources, including nested inline sections.
pub fn referenced_classes(manager: &ConfigManager) -> Result<BTreeSet<String>> {
    let mut classes = BTreeSet::new();
    for source in manager.sources() {
        for (name, section) in source.iter() {
            collect_classes(manager, section.as_ref(), &mut classes)
                .with_context(|| format!("Inspecting section {name:?}"))?;
        }
    }
    Ok(classes)
}

fn collect_classes(manager: &ConfigManager, section: &dyn Section, classes: &mut BTreeSet<String>) -> Result<()> {
    for key in section.keys() {
        let parts = match section.render_value(manager, &key, &TypeTag::Repr)?.into_repr()? {
            Repr::Value(value) => Parts::base(value),
            Repr::Parts(_, parts) => parts,
        };
        for value in [parts.prepend, parts.base, parts.append].into_iter().flatten() {
            if key == "class" {
                match &value {
                    Value::Str(name) => {
                        classes.insert(name.trim().to_string());
                    }
                    Value::Callable(c) => {
                        classes.insert(c.name().to_string());
                    }
                    _ => {}
                }
            }
            let nested: Vec<&Rc<dyn Section>> = match &value {
                Value::Ref(SectionRef::Inline(section)) => vec![section],
                Value::Refs(refs) => refs
                    .iter()
                    .filter_map(|r| match r {
                        SectionRef::Inline(section) => Some(section),
                        SectionRef::Named(_) => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            for section in nested {
                collect_classes(manager, section.as_ref(), classes)?;
            }
        }
    }
    Ok(())
}

