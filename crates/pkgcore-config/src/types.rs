// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Type descriptors and the value shapes that flow between sections,
//! the collapser and configured callables.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::collapse::CollapsedConfig;
use crate::configurable::Configurable;
use crate::error::Error;
use crate::lazy_ref::LazyRef;
use crate::section::Section;

#[cfg(test)]
#[path = "./types_test.rs"]
mod types_test;

/// The declared type of one configuration argument.
///
/// The textual forms are `str`, `bool`, `int`, `list`, `callable`, `repr`,
/// `ref:<typename>`, `refs:<typename>`, `lazy_ref:<typename>` and
/// `lazy_refs:<typename>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Str,
    Bool,
    Int,
    List,
    Callable,
    Ref(String),
    Refs(String),
    LazyRef(String),
    LazyRefs(String),
    /// Raw representation, used when dumping uncollapsed sections
    Repr,
}

impl TypeTag {
    /// Types whose values accumulate across inherit chains via prepend/append.
    pub fn is_incremental(&self) -> bool {
        matches!(
            self,
            Self::Str | Self::List | Self::Refs(_) | Self::LazyRefs(_)
        )
    }

    /// Whether the value stays a reference until the callable asks for it.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::LazyRef(_) | Self::LazyRefs(_))
    }

    /// The same type with any laziness removed.
    pub fn eager(&self) -> TypeTag {
        match self {
            Self::LazyRef(t) => Self::Ref(t.clone()),
            Self::LazyRefs(t) => Self::Refs(t.clone()),
            other => other.clone(),
        }
    }

    /// The typename a reference type points at.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Ref(t) | Self::Refs(t) | Self::LazyRef(t) | Self::LazyRefs(t) => Some(t),
            _ => None,
        }
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = match s {
            "str" => Self::Str,
            "bool" => Self::Bool,
            "int" => Self::Int,
            "list" => Self::List,
            "callable" => Self::Callable,
            "repr" => Self::Repr,
            _ => {
                let (prefix, target) = s
                    .split_once(':')
                    .ok_or_else(|| Error::type_definition(format!("unknown type {s:?}")))?;
                if target.is_empty() {
                    return Err(Error::type_definition(format!(
                        "reference type {s:?} is missing a typename"
                    )));
                }
                let target = target.to_string();
                match prefix {
                    "ref" => Self::Ref(target),
                    "refs" => Self::Refs(target),
                    "lazy_ref" => Self::LazyRef(target),
                    "lazy_refs" => Self::LazyRefs(target),
                    _ => return Err(Error::type_definition(format!("unknown type {s:?}"))),
                }
            }
        };
        Ok(tag)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("str"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::List => f.write_str("list"),
            Self::Callable => f.write_str("callable"),
            Self::Repr => f.write_str("repr"),
            Self::Ref(t) => write!(f, "ref:{t}"),
            Self::Refs(t) => write!(f, "refs:{t}"),
            Self::LazyRef(t) => write!(f, "lazy_ref:{t}"),
            Self::LazyRefs(t) => write!(f, "lazy_refs:{t}"),
        }
    }
}

/// Reference to another section, either by name or embedded inline.
#[derive(Clone)]
pub enum SectionRef {
    Named(String),
    Inline(Rc<dyn Section>),
}

impl fmt::Debug for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

impl From<&str> for SectionRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<Rc<dyn Section>> for SectionRef {
    fn from(section: Rc<dyn Section>) -> Self {
        Self::Inline(section)
    }
}

/// The shape of a raw [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Bool,
    Int,
    List,
    Callable,
    Ref,
    Refs,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Str => "str",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::List => "list",
            Self::Callable => "callable",
            Self::Ref => "ref",
            Self::Refs => "refs",
        };
        f.write_str(name)
    }
}

/// A raw value as stored in a section, before conversion.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
    Callable(Rc<Configurable>),
    Ref(SectionRef),
    Refs(Vec<SectionRef>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Str(_) => ValueKind::Str,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::List(_) => ValueKind::List,
            Self::Callable(_) => ValueKind::Callable,
            Self::Ref(_) => ValueKind::Ref,
            Self::Refs(_) => ValueKind::Refs,
        }
    }

    /// Mirror of truthiness: empty strings and sequences count as unset.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Refs(r) => r.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(String::from).collect())
    }
}

impl From<Rc<Configurable>> for Value {
    fn from(value: Rc<Configurable>) -> Self {
        Self::Callable(value)
    }
}

impl From<SectionRef> for Value {
    fn from(value: SectionRef) -> Self {
        Self::Ref(value)
    }
}

/// A value after conversion to its declared type.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
    Callable(Rc<Configurable>),
    Ref(Rc<CollapsedConfig>),
    Refs(Vec<Rc<CollapsedConfig>>),
    LazyRef(LazyRef),
    LazyRefs(Vec<LazyRef>),
}

impl ConfigValue {
    /// Empty strings and sequences count as unset when merging inherit chains.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Refs(r) => r.is_empty(),
            Self::LazyRefs(r) => r.is_empty(),
            _ => false,
        }
    }
}
