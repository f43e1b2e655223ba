// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Configurable callables and the registry that names them.
//!
//! A section's `class` names a [`Configurable`] in the manager's
//! [`Registry`]. The configurable describes its parameters with a
//! [`Signature`] (or an authorative [`ConfigHint`]) and is invoked with the
//! converted section values packed into [`Arguments`].

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::error::{BoxError, Error, Result};
use crate::hint::ConfigHint;
use crate::lazy_ref::LazyRef;
use crate::manager::ConfigManager;
use crate::types::Value;

#[cfg(test)]
#[path = "./configurable_test.rs"]
mod configurable_test;

/// An object produced by instantiating a section.
#[derive(Clone)]
pub struct Instance {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

impl Instance {
    pub fn new<T: Any>(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.value).downcast::<T>().ok()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }

    /// Rust type name of the wrapped object, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.type_name)
    }
}

/// One named parameter of a configurable.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// Declared parameters of a configurable, in call order.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    /// The first parameter is a receiver and is never configured
    pub receiver: bool,
    /// Accepts arbitrary extra positional arguments
    pub var_args: bool,
    /// Accepts arbitrary extra keyword arguments
    pub var_kwargs: bool,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn with_receiver(mut self, name: impl Into<String>) -> Self {
        self.params.insert(
            0,
            Param {
                name: name.into(),
                default: None,
            },
        );
        self.receiver = true;
        self
    }

    pub fn with_var_args(mut self) -> Self {
        self.var_args = true;
        self
    }

    pub fn with_var_kwargs(mut self) -> Self {
        self.var_kwargs = true;
        self
    }

    /// Parameters that are actually configured, skipping any receiver.
    pub fn configured_params(&self) -> &[Param] {
        if self.receiver && !self.params.is_empty() {
            &self.params[1..]
        } else {
            &self.params
        }
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.configured_params().iter().find(|p| p.name == name)
    }
}

type Factory = dyn Fn(Arguments) -> std::result::Result<Option<Instance>, BoxError>;

/// A named callable that can be referenced from a section's `class`.
pub struct Configurable {
    name: String,
    signature: Option<Signature>,
    hint: Option<ConfigHint>,
    factory: Rc<Factory>,
}

impl Configurable {
    pub fn new<F>(name: impl Into<String>, signature: Signature, factory: F) -> Self
    where
        F: Fn(Arguments) -> std::result::Result<Option<Instance>, BoxError> + 'static,
    {
        Self {
            name: name.into(),
            signature: Some(signature),
            hint: None,
            factory: Rc::new(factory),
        }
    }

    /// A callable whose parameters cannot be introspected.
    ///
    /// Only usable as a `class` once an authorative hint is attached.
    pub fn opaque<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Arguments) -> std::result::Result<Option<Instance>, BoxError> + 'static,
    {
        Self {
            name: name.into(),
            signature: None,
            hint: None,
            factory: Rc::new(factory),
        }
    }

    pub fn with_hint(mut self, hint: ConfigHint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Fully qualified name, as written in `class = ...`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last dotted component of the name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn hint(&self) -> Option<&ConfigHint> {
        self.hint.as_ref()
    }

    pub fn call(&self, args: Arguments) -> std::result::Result<Option<Instance>, BoxError> {
        (self.factory)(args)
    }
}

impl fmt::Debug for Configurable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<configurable {}>", self.name)
    }
}

/// A single argument handed to a configurable.
#[derive(Debug, Clone)]
pub enum Arg {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
    Callable(Rc<Configurable>),
    Instance(Instance),
    Instances(Vec<Instance>),
    LazyRef(LazyRef),
    LazyRefs(Vec<LazyRef>),
    Manager(ConfigManager),
}

impl Arg {
    fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::List(_) => "list",
            Self::Callable(_) => "callable",
            Self::Instance(_) => "instance",
            Self::Instances(_) => "instances",
            Self::LazyRef(_) => "lazy_ref",
            Self::LazyRefs(_) => "lazy_refs",
            Self::Manager(_) => "config manager",
        }
    }

    /// Argument form of a signature default, if it has one.
    pub fn from_default(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(Self::Str(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Int(i) => Some(Self::Int(*i)),
            Value::List(l) => Some(Self::List(l.clone())),
            Value::Callable(c) => Some(Self::Callable(Rc::clone(c))),
            Value::Ref(_) | Value::Refs(_) => None,
        }
    }
}

/// Failure to extract an argument in the shape a configurable expects.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("missing argument {0:?}")]
    Missing(String),
    #[error("argument {name:?} should be {expected}, got {got}")]
    WrongType {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
}

/// Positional and keyword arguments for one configurable call.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    positional: Vec<(String, Arg)>,
    keywords: IndexMap<String, Arg>,
}

macro_rules! typed_accessor {
    ($fn:ident, $variant:ident, $ret:ty, $expected:literal) => {
        pub fn $fn(&self, name: &str) -> std::result::Result<$ret, ArgumentError> {
            match self.require(name)? {
                Arg::$variant(v) => Ok(v),
                other => Err(ArgumentError::WrongType {
                    name: name.to_string(),
                    expected: $expected,
                    got: other.kind(),
                }),
            }
        }
    };
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_positional(&mut self, name: impl Into<String>, arg: Arg) {
        self.positional.push((name.into(), arg));
    }

    pub fn insert(&mut self, name: impl Into<String>, arg: Arg) {
        self.keywords.insert(name.into(), arg);
    }

    pub fn with(mut self, name: impl Into<String>, arg: Arg) -> Self {
        self.insert(name, arg);
        self
    }

    /// Remove a keyword argument, returning it.
    pub fn take(&mut self, name: &str) -> Option<Arg> {
        self.keywords.shift_remove(name)
    }

    pub fn positional(&self) -> &[(String, Arg)] {
        &self.positional
    }

    pub fn keywords(&self) -> &IndexMap<String, Arg> {
        &self.keywords
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.positional
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
            .or_else(|| self.keywords.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn require(&self, name: &str) -> std::result::Result<&Arg, ArgumentError> {
        self.get(name)
            .ok_or_else(|| ArgumentError::Missing(name.to_string()))
    }

    pub fn str(&self, name: &str) -> std::result::Result<&str, ArgumentError> {
        match self.require(name)? {
            Arg::Str(s) => Ok(s.as_str()),
            other => Err(ArgumentError::WrongType {
                name: name.to_string(),
                expected: "str",
                got: other.kind(),
            }),
        }
    }

    pub fn opt_str(&self, name: &str) -> std::result::Result<Option<&str>, ArgumentError> {
        match self.get(name) {
            None => Ok(None),
            Some(_) => self.str(name).map(Some),
        }
    }

    pub fn bool(&self, name: &str) -> std::result::Result<bool, ArgumentError> {
        match self.require(name)? {
            Arg::Bool(b) => Ok(*b),
            other => Err(ArgumentError::WrongType {
                name: name.to_string(),
                expected: "bool",
                got: other.kind(),
            }),
        }
    }

    pub fn int(&self, name: &str) -> std::result::Result<i64, ArgumentError> {
        match self.require(name)? {
            Arg::Int(i) => Ok(*i),
            other => Err(ArgumentError::WrongType {
                name: name.to_string(),
                expected: "int",
                got: other.kind(),
            }),
        }
    }

    typed_accessor!(list, List, &Vec<String>, "list");
    typed_accessor!(callable, Callable, &Rc<Configurable>, "callable");
    typed_accessor!(instance, Instance, &Instance, "instance");
    typed_accessor!(instances, Instances, &Vec<Instance>, "instances");
    typed_accessor!(lazy_ref, LazyRef, &LazyRef, "lazy_ref");
    typed_accessor!(lazy_refs, LazyRefs, &Vec<LazyRef>, "lazy_refs");
    typed_accessor!(manager, Manager, &ConfigManager, "config manager");

    /// Fetch an instance argument as a concrete type.
    pub fn downcast<T: Any>(&self, name: &str) -> std::result::Result<Rc<T>, ArgumentError> {
        let instance = self.instance(name)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| ArgumentError::WrongType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
                got: instance.type_name(),
            })
    }
}

/// Name-to-callable lookup used to resolve `class` values.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: IndexMap<String, Rc<Configurable>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the stock parsers and helpers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::basics::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, configurable: Configurable) -> Rc<Configurable> {
        let configurable = Rc::new(configurable);
        self.insert(Rc::clone(&configurable));
        configurable
    }

    pub fn insert(&mut self, configurable: Rc<Configurable>) {
        self.entries
            .insert(configurable.name().to_string(), configurable);
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Configurable>> {
        self.entries.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<Rc<Configurable>> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::configuration(format!("cannot import {name:?}")))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Configurable>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
