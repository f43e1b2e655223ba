// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! The section abstraction and the in-memory dict-backed sections.
//!
//! A section is a read-only key/value view. Keys may additionally appear
//! with a `.prepend` or `.append` suffix; for incremental types those parts
//! are rendered alongside the base value so the collapser can compose them
//! across an inherit chain.

use std::fmt;

use indexmap::IndexMap;

use crate::convert::{convert_asis, convert_hybrid, convert_string};
use crate::error::{Error, ErrorContext, Result};
use crate::manager::ConfigManager;
use crate::types::{ConfigValue, SectionRef, TypeTag, Value, ValueKind};

#[cfg(test)]
#[path = "./section_test.rs"]
mod section_test;

pub const PREPEND_SUFFIX: &str = ".prepend";
pub const APPEND_SUFFIX: &str = ".append";

/// A parsed, untyped configuration stanza.
pub trait Section: fmt::Debug {
    /// Whether the key is set, directly or through its prepend/append parts.
    fn contains(&self, key: &str) -> bool;

    /// Unique base keys, without any prepend/append suffix.
    fn keys(&self) -> Vec<String>;

    /// Convert the value of `key` to the requested type.
    ///
    /// Incremental types render as [`Rendered::Parts`], [`TypeTag::Repr`]
    /// renders as [`Rendered::Repr`] and everything else as
    /// [`Rendered::Value`].
    fn render_value(&self, manager: &ConfigManager, key: &str, ty: &TypeTag) -> Result<Rendered>;
}

/// The prepend, base and append parts of an incremental value.
#[derive(Debug, Clone)]
pub struct Parts<T> {
    pub prepend: Option<T>,
    pub base: Option<T>,
    pub append: Option<T>,
}

impl<T> Parts<T> {
    pub fn base(value: T) -> Self {
        Self {
            prepend: None,
            base: Some(value),
            append: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prepend.is_none() && self.base.is_none() && self.append.is_none()
    }

    pub fn map<U, F>(self, mut f: F) -> std::result::Result<Parts<U>, Error>
    where
        F: FnMut(T) -> Result<U>,
    {
        Ok(Parts {
            prepend: self.prepend.map(&mut f).transpose()?,
            base: self.base.map(&mut f).transpose()?,
            append: self.append.map(&mut f).transpose()?,
        })
    }
}

/// Raw value of a key together with its kind, for inspection tools.
#[derive(Debug, Clone)]
pub enum Repr {
    Value(Value),
    Parts(ValueKind, Parts<Value>),
}

/// Result of [`Section::render_value`].
#[derive(Debug, Clone)]
pub enum Rendered {
    Value(ConfigValue),
    Parts(Parts<ConfigValue>),
    Repr(Repr),
}

impl Rendered {
    pub fn into_value(self) -> Result<ConfigValue> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Parts(Parts {
                prepend: None,
                base: Some(value),
                append: None,
            }) => Ok(value),
            other => Err(Error::configuration(format!(
                "expected a single value, got {other:?}"
            ))),
        }
    }

    pub fn into_parts(self) -> Result<Parts<ConfigValue>> {
        match self {
            Self::Parts(parts) => Ok(parts),
            Self::Value(value) => Ok(Parts::base(value)),
            Self::Repr(_) => Err(Error::configuration("expected parts, got a repr")),
        }
    }

    pub fn into_repr(self) -> Result<Repr> {
        match self {
            Self::Repr(repr) => Ok(repr),
            _ => Err(Error::configuration("expected a repr")),
        }
    }
}

/// How a [`DictSection`] converts its stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Every value is a raw string
    String,
    /// Values are already typed
    AsIs,
    /// Strings are parsed for non-`str` types, anything else is taken as-is
    Hybrid,
}

/// A section backed by an ordered map.
#[derive(Debug, Clone)]
pub struct DictSection {
    conversion: Conversion,
    values: IndexMap<String, Value>,
}

impl DictSection {
    pub fn new<I, K>(conversion: Conversion, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            conversion,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// A section of raw strings, as produced by text parsers.
    pub fn strings<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            Conversion::String,
            values
                .into_iter()
                .map(|(k, v)| (k, Value::Str(v.into()))),
        )
    }

    pub fn as_is<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::new(Conversion::AsIs, values)
    }

    pub fn hybrid<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::new(Conversion::Hybrid, values)
    }

    pub fn conversion(&self) -> Conversion {
        self.conversion
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// The stored value of an exact key, suffix included.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn convert(&self, manager: &ConfigManager, value: &Value, ty: &TypeTag) -> Result<ConfigValue> {
        match self.conversion {
            Conversion::String => match value {
                Value::Str(s) => convert_string(manager, s, ty),
                other => Err(Error::configuration(format!(
                    "string conversion invoked with non str value {other:?}"
                ))),
            },
            Conversion::AsIs => convert_asis(manager, value, ty),
            Conversion::Hybrid => convert_hybrid(manager, value, ty),
        }
    }

    fn convert_named(
        &self,
        manager: &ConfigManager,
        name: &str,
        value: Option<&Value>,
        ty: &TypeTag,
    ) -> Result<Option<ConfigValue>> {
        value
            .map(|v| {
                self.convert(manager, v, ty)
                    .with_context(|| format!("Converting argument {name:?} to {ty}"))
            })
            .transpose()
    }
}

impl Section for DictSection {
    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
            || self.values.contains_key(&format!("{key}{PREPEND_SUFFIX}"))
            || self.values.contains_key(&format!("{key}{APPEND_SUFFIX}"))
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.values.keys() {
            let base = strip_part_suffix(key);
            if !keys.iter().any(|k| k == base) {
                keys.push(base.to_string());
            }
        }
        keys
    }

    fn render_value(&self, manager: &ConfigManager, key: &str, ty: &TypeTag) -> Result<Rendered> {
        if !ty.is_incremental() && *ty != TypeTag::Repr {
            let value = self.values.get(key).ok_or_else(|| not_found(key))?;
            let converted = self
                .convert(manager, value, ty)
                .with_context(|| format!("Converting argument {key:?} to {ty}"))?;
            return Ok(Rendered::Value(converted));
        }

        let prepend_key = format!("{key}{PREPEND_SUFFIX}");
        let append_key = format!("{key}{APPEND_SUFFIX}");
        let raw = Parts {
            prepend: self.values.get(&prepend_key),
            base: self.values.get(key),
            append: self.values.get(&append_key),
        };
        if raw.is_empty() {
            return Err(not_found(key));
        }

        if *ty == TypeTag::Repr {
            let owned = Parts {
                prepend: raw.prepend.cloned(),
                base: raw.base.cloned(),
                append: raw.append.cloned(),
            };
            return Ok(Rendered::Repr(merge_repr(owned)));
        }

        Ok(Rendered::Parts(Parts {
            prepend: self.convert_named(manager, &prepend_key, raw.prepend, ty)?,
            base: self.convert_named(manager, key, raw.base, ty)?,
            append: self.convert_named(manager, &append_key, raw.append, ty)?,
        }))
    }
}

fn not_found(key: &str) -> Error {
    Error::configuration(format!("{key:?} not found"))
}

/// Strip a `.prepend` or `.append` suffix from a key.
pub fn strip_part_suffix(key: &str) -> &str {
    key.strip_suffix(PREPEND_SUFFIX)
        .or_else(|| key.strip_suffix(APPEND_SUFFIX))
        .unwrap_or(key)
}

/// Reduce raw prepend/base/append values to one common kind.
///
/// Any reference forces `refs`; all-string parts stay `str`; any other
/// mixture becomes `list`. Scalars are stringified first.
pub fn merge_repr(parts: Parts<Value>) -> Repr {
    if parts.prepend.is_none() && parts.append.is_none() {
        return match parts.base {
            Some(value) => match value.kind() {
                kind @ (ValueKind::List | ValueKind::Str | ValueKind::Refs) => {
                    Repr::Parts(kind, Parts::base(value))
                }
                _ => Repr::Value(value),
            },
            None => Repr::Parts(ValueKind::Str, parts),
        };
    }

    let kinds: Vec<ValueKind> = [&parts.prepend, &parts.base, &parts.append]
        .into_iter()
        .flatten()
        .map(Value::kind)
        .collect();
    let target = if kinds
        .iter()
        .any(|k| matches!(k, ValueKind::Ref | ValueKind::Refs))
    {
        ValueKind::Refs
    } else if kinds.iter().all(|k| *k == ValueKind::Str) {
        ValueKind::Str
    } else {
        ValueKind::List
    };

    let convert = |value: Option<Value>| value.map(|v| coerce_repr(v, target));
    Repr::Parts(
        target,
        Parts {
            prepend: convert(parts.prepend),
            base: convert(parts.base),
            append: convert(parts.append),
        },
    )
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Callable(c) => Some(c.name().to_string()),
        Value::List(_) | Value::Ref(_) | Value::Refs(_) => None,
    }
}

fn coerce_repr(value: Value, target: ValueKind) -> Value {
    match (target, value) {
        (ValueKind::Refs, Value::Ref(r)) => Value::Refs(vec![r]),
        (ValueKind::Refs, Value::List(l)) => {
            Value::Refs(l.into_iter().map(SectionRef::Named).collect())
        }
        (_, v @ (Value::Refs(_) | Value::List(_))) => v,
        (target, other) => match stringify(&other) {
            Some(s) => match target {
                ValueKind::Str => Value::Str(s),
                ValueKind::Refs => Value::Refs(vec![SectionRef::Named(s)]),
                _ => Value::List(vec![s]),
            },
            None => other,
        },
    }
}
