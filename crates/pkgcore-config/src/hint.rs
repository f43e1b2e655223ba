// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Type descriptors derived from configurables and the hints that adjust them.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::configurable::Configurable;
use crate::error::{Error, Result};
use crate::types::{TypeTag, Value};

#[cfg(test)]
#[path = "./hint_test.rs"]
mod hint_test;

/// Section keys with fixed meaning that no configurable may redeclare.
pub const RESERVED_KEYS: [&str; 4] = ["class", "inherit", "default", "inherit-only"];

/// Declarative overrides attached to a [`Configurable`].
///
/// Unless `authorative` is set, a hint only augments what the callable's
/// signature already describes. Clone a hint and call the builder methods
/// to derive a variant with some fields overridden.
#[derive(Debug, Clone, Default)]
pub struct ConfigHint {
    pub types: IndexMap<String, TypeTag>,
    pub positional: Vec<String>,
    pub required: Vec<String>,
    pub typename: Option<String>,
    pub doc: Option<String>,
    pub allow_unknowns: bool,
    pub authorative: bool,
    pub requires_config: Option<String>,
}

impl ConfigHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: impl Into<String>, tag: TypeTag) -> Self {
        self.types.insert(name.into(), tag);
        self
    }

    pub fn positional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.positional = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn typename(mut self, typename: impl Into<String>) -> Self {
        self.typename = Some(typename.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn allow_unknowns(mut self, allow: bool) -> Self {
        self.allow_unknowns = allow;
        self
    }

    pub fn authorative(mut self, authorative: bool) -> Self {
        self.authorative = authorative;
        self
    }

    pub fn requires_config(mut self, slot: impl Into<String>) -> Self {
        self.requires_config = Some(slot.into());
        self
    }
}

/// The typed parameter schema of one configurable.
#[derive(Debug, Clone)]
pub struct ConfigType {
    /// Public typename, such as `repo` or `cache`
    pub name: String,
    pub callable: Rc<Configurable>,
    pub doc: Option<String>,
    pub types: IndexMap<String, TypeTag>,
    pub positional: Vec<String>,
    pub required: Vec<String>,
    pub allow_unknowns: bool,
    /// Parameter that receives the manager itself
    pub requires_config: Option<String>,
}

impl ConfigType {
    /// Describe a configurable from its signature and hint.
    pub fn new(callable: Rc<Configurable>) -> Result<Self> {
        let hint = callable.hint().cloned();
        let authorative = hint.as_ref().is_some_and(|h| h.authorative);

        let mut config_type = Self {
            name: callable.short_name().to_string(),
            callable: Rc::clone(&callable),
            doc: None,
            types: IndexMap::new(),
            positional: Vec::new(),
            required: Vec::new(),
            allow_unknowns: false,
            requires_config: None,
        };

        if !authorative {
            config_type.introspect()?;
        }
        if let Some(hint) = hint {
            config_type.apply_hint(hint);
        }
        if let Some(slot) = config_type.requires_config.clone() {
            config_type.required.retain(|name| name != &slot);
            config_type.types.shift_remove(&slot);
        }
        config_type.validate()?;
        Ok(config_type)
    }

    fn introspect(&mut self) -> Result<()> {
        let name = self.callable.name().to_string();
        let signature = self.callable.signature().ok_or_else(|| {
            Error::type_definition(format!(
                "{name} is not authorative and cannot be introspected"
            ))
        })?;
        if signature.var_args {
            return Err(Error::type_definition(format!("func {name} accepts *args")));
        }
        self.allow_unknowns = signature.var_kwargs;

        for param in signature.configured_params() {
            let tag = match &param.default {
                None => {
                    self.positional.push(param.name.clone());
                    self.required.push(param.name.clone());
                    TypeTag::Str
                }
                Some(Value::Bool(_)) => TypeTag::Bool,
                Some(Value::List(_)) => TypeTag::List,
                Some(Value::Int(_)) => TypeTag::Int,
                Some(_) => TypeTag::Str,
            };
            self.types.insert(param.name.clone(), tag);
        }
        Ok(())
    }

    fn apply_hint(&mut self, hint: ConfigHint) {
        self.types.extend(hint.types);
        if !hint.required.is_empty() {
            self.required = hint.required;
        }
        if !hint.positional.is_empty() {
            self.positional = hint.positional;
        }
        if let Some(typename) = hint.typename {
            self.name = typename;
        }
        if hint.doc.is_some() {
            self.doc = hint.doc;
        }
        self.allow_unknowns |= hint.allow_unknowns;
        self.requires_config = hint.requires_config;
    }

    fn validate(&self) -> Result<()> {
        let name = self.callable.name();
        for key in RESERVED_KEYS {
            if self.types.contains_key(key) {
                return Err(Error::type_definition(format!(
                    "{name}: you cannot change the type of {key:?}"
                )));
            }
        }
        for arg in &self.positional {
            let is_slot = self.requires_config.as_deref() == Some(arg.as_str());
            if !is_slot && !self.required.contains(arg) {
                return Err(Error::type_definition(format!(
                    "{name}: {arg:?} is in positionals but not in required"
                )));
            }
        }
        Ok(())
    }

    /// The declared type of a key, if any.
    pub fn type_of(&self, key: &str) -> Option<&TypeTag> {
        self.types.get(key)
    }
}
