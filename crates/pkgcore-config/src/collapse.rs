// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Collapsing sections into typed construction plans.
//!
//! Collapsing walks a section's `inherit` chain, resolves its `class`,
//! converts each key to the type the class declares (composing incremental
//! values across the chain) and collapses referenced sections. The result
//! is a [`CollapsedConfig`] that can be instantiated at most once.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;

use crate::configurable::{Arg, Arguments, Instance};
use crate::error::{Error, ErrorContext, ErrorKind, Result};
use crate::hint::{ConfigType, RESERVED_KEYS};
use crate::lazy_ref::LazyRef;
use crate::manager::{ConfigManager, WeakManager};
use crate::section::{Parts, Section};
use crate::types::{ConfigValue, TypeTag};

#[cfg(test)]
#[path = "./collapse_test.rs"]
mod collapse_test;

/// A fully resolved section, ready to be instantiated.
pub struct CollapsedConfig {
    config_type: ConfigType,
    config: IndexMap<String, ConfigValue>,
    name: Option<String>,
    default: bool,
    debug: bool,
    manager: WeakManager,
    instance: OnceCell<Instance>,
    instantiating: Cell<bool>,
}

impl std::fmt::Debug for CollapsedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollapsedConfig")
            .field("name", &self.name)
            .field("type", &self.config_type.name)
            .field("callable", &self.config_type.callable.name())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl CollapsedConfig {
    pub fn new(
        manager: &ConfigManager,
        config_type: ConfigType,
        config: IndexMap<String, ConfigValue>,
        name: Option<String>,
        default: bool,
    ) -> Self {
        Self {
            config_type,
            config,
            name,
            default,
            debug: manager.debug(),
            manager: manager.downgrade(),
            instance: OnceCell::new(),
            instantiating: Cell::new(false),
        }
    }

    /// Typename of the section's class.
    pub fn type_name(&self) -> &str {
        &self.config_type.name
    }

    pub fn config_type(&self) -> &ConfigType {
        &self.config_type
    }

    /// Converted arguments, keyed by parameter name.
    pub fn config(&self) -> &IndexMap<String, ConfigValue> {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    /// Section name, `None` for inline sections.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The instance, if this section was already instantiated.
    pub fn cached_instance(&self) -> Option<&Instance> {
        self.instance.get()
    }

    fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{name:?}"),
            None => "<anonymous section>".to_string(),
        }
    }

    /// Construct the configured object, or return the one built earlier.
    pub fn instantiate(&self) -> Result<Instance> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }
        if self.instantiating.replace(true) {
            return Err(Error::configuration(format!(
                "Instantiating {} is recursive",
                self.display_name()
            )));
        }
        let result = self.instantiate_uncached();
        self.instantiating.set(false);
        let instance = result?;
        Ok(self.instance.get_or_init(|| instance).clone())
    }

    fn instantiate_uncached(&self) -> Result<Instance> {
        let callable = &self.config_type.callable;
        tracing::debug!(section = %self.display_name(), callable = callable.name(), "instantiating");

        let mut kwargs: IndexMap<String, Arg> = IndexMap::new();
        for (key, value) in &self.config {
            let arg = match value {
                ConfigValue::Str(s) => Arg::Str(s.clone()),
                ConfigValue::Bool(b) => Arg::Bool(*b),
                ConfigValue::Int(i) => Arg::Int(*i),
                ConfigValue::List(l) => Arg::List(l.clone()),
                ConfigValue::Callable(c) => Arg::Callable(Rc::clone(c)),
                ConfigValue::Ref(target) => Arg::Instance(instantiate_ref(key, target)?),
                ConfigValue::Refs(targets) => Arg::Instances(
                    targets
                        .iter()
                        .map(|target| instantiate_ref(key, target))
                        .collect::<Result<_>>()?,
                ),
                ConfigValue::LazyRef(r) => Arg::LazyRef(r.clone()),
                ConfigValue::LazyRefs(r) => Arg::LazyRefs(r.clone()),
            };
            kwargs.insert(key.clone(), arg);
        }

        if let Some(slot) = &self.config_type.requires_config {
            let manager = self.manager.upgrade()?;
            kwargs.insert(slot.clone(), Arg::Manager(manager));
        }

        if let Some(signature) = callable.signature() {
            for param in signature.configured_params() {
                if kwargs.contains_key(&param.name) {
                    continue;
                }
                if let Some(arg) = param.default.as_ref().and_then(Arg::from_default) {
                    kwargs.insert(param.name.clone(), arg);
                }
            }
        }

        let mut args = Arguments::new();
        for name in &self.config_type.positional {
            let arg = kwargs.shift_remove(name).ok_or_else(|| {
                Error::configuration(format!("positional argument {name:?} is not set"))
                    .context(format!("Instantiating {}", self.display_name()))
            })?;
            args.push_positional(name.clone(), arg);
        }
        for (name, arg) in kwargs {
            args.insert(name, arg);
        }

        match callable.call(args.clone()) {
            Ok(Some(instance)) => Ok(instance),
            Ok(None) => Err(Error::new(ErrorKind::NoObjectReturned {
                callable: callable.name().to_string(),
            })),
            Err(err) => match Error::downcast_callable(err) {
                Ok(err) => Err(err.context(format!("Instantiating {}", self.display_name()))),
                Err(err) if self.debug => Err(Error::new(ErrorKind::Callable(err))),
                Err(err) => Err(Error::new(ErrorKind::ComplexInstantiation {
                    callable: callable.name().to_string(),
                    pargs: args
                        .positional()
                        .iter()
                        .map(|(_, arg)| format!("{arg:?}"))
                        .collect(),
                    kwargs: args
                        .keywords()
                        .iter()
                        .map(|(name, arg)| (name.clone(), format!("{arg:?}")))
                        .collect(),
                    source: err,
                })),
            },
        }
    }
}

fn instantiate_ref(key: &str, target: &CollapsedConfig) -> Result<Instance> {
    target.instantiate().with_context(|| {
        format!(
            "Instantiating reference {key:?} pointing at {}",
            target.display_name()
        )
    })
}

/// One link of an inherit chain: a section name and the sources defining it.
struct ChainLink {
    name: Option<String>,
    stack: Vec<Rc<dyn Section>>,
}

fn read_bool(manager: &ConfigManager, section: &dyn Section, key: &str) -> Result<bool> {
    match section
        .render_value(manager, key, &TypeTag::Bool)?
        .into_value()?
    {
        ConfigValue::Bool(b) => Ok(b),
        other => Err(Error::configuration(format!(
            "{key:?} should be a bool, got {other:?}"
        ))),
    }
}

/// Map out the inherit chain, most specific section first.
fn inherited_sections(
    manager: &ConfigManager,
    name: Option<&str>,
    stack: &[Rc<dyn Section>],
) -> Result<Vec<Rc<dyn Section>>> {
    let mut chain = vec![ChainLink {
        name: name.map(String::from),
        stack: stack.to_vec(),
    }];
    let mut seen: HashSet<String> = name.into_iter().map(String::from).collect();

    let mut index = 0;
    while index < chain.len() {
        let current = Rc::clone(&chain[index].stack[0]);
        let current_name = chain[index].name.clone();
        index += 1;
        if !current.contains("inherit") {
            continue;
        }

        let parts = current
            .render_value(manager, "inherit", &TypeTag::List)?
            .into_parts()?;
        if parts.prepend.is_some() || parts.append.is_some() {
            return Err(Error::configuration(
                "Prepending or appending to the inherit list makes no sense",
            ));
        }
        let inherits = match parts.base {
            Some(ConfigValue::List(names)) => names,
            _ => Vec::new(),
        };

        for inherit in inherits {
            if current_name.as_deref() == Some(inherit.as_str()) {
                let parent = &chain[index - 1].stack;
                if parent.len() <= 1 {
                    return Err(Error::configuration(format!(
                        "Self-inherit {inherit:?} cannot be found"
                    )));
                }
                let later = parent[1..].to_vec();
                chain.push(ChainLink {
                    name: Some(inherit),
                    stack: later,
                });
                continue;
            }
            if !seen.insert(inherit.clone()) {
                return Err(Error::configuration(format!(
                    "Inherit {inherit:?} is recursive"
                )));
            }
            let target = manager.section_stack(&inherit).ok_or_else(|| {
                Error::configuration(format!("Inherit target {inherit:?} cannot be found"))
            })?;
            chain.push(ChainLink {
                name: Some(inherit),
                stack: target,
            });
        }
    }

    Ok(chain.into_iter().map(|link| Rc::clone(&link.stack[0])).collect())
}

/// Collapse a stack of same-named sections (most specific first).
pub(crate) fn collapse_section(
    manager: &ConfigManager,
    stack: &[Rc<dyn Section>],
    name: Option<&str>,
) -> Result<CollapsedConfig> {
    let first = stack
        .first()
        .ok_or_else(|| Error::configuration("no sections to collapse"))?;
    if first.contains("inherit-only") && read_bool(manager, first.as_ref(), "inherit-only")? {
        return Err(Error::new(ErrorKind::CollapseInheritOnly));
    }

    let chain = inherited_sections(manager, name, stack)?;

    let mut config_stack: IndexMap<String, Vec<Rc<dyn Section>>> = IndexMap::new();
    for section in &chain {
        for key in section.keys() {
            config_stack
                .entry(key)
                .or_default()
                .push(Rc::clone(section));
        }
    }

    let class = match render_first(manager, &config_stack, "class", &TypeTag::Callable)? {
        Some(ConfigValue::Callable(callable)) => callable,
        Some(other) => {
            return Err(Error::configuration(format!(
                "class should be a callable, got {other:?}"
            )));
        }
        None => return Err(Error::configuration("no class specified")),
    };
    let config_type = ConfigType::new(class)?;
    let default = matches!(
        render_first(manager, &config_stack, "default", &TypeTag::Bool)?,
        Some(ConfigValue::Bool(true))
    );

    for key in RESERVED_KEYS {
        config_stack.shift_remove(key);
    }

    let config = render_config_stack(manager, &config_type, &config_stack)?;
    tracing::debug!(
        section = name.unwrap_or("<anonymous>"),
        typename = %config_type.name,
        "collapsed section"
    );
    Ok(CollapsedConfig::new(
        manager,
        config_type,
        config,
        name.map(String::from),
        default,
    ))
}

fn render_first(
    manager: &ConfigManager,
    config_stack: &IndexMap<String, Vec<Rc<dyn Section>>>,
    key: &str,
    ty: &TypeTag,
) -> Result<Option<ConfigValue>> {
    let Some(section) = config_stack.get(key).and_then(|sections| sections.first()) else {
        return Ok(None);
    };
    section
        .render_value(manager, key, ty)?
        .into_value()
        .map(Some)
}

fn render_config_stack(
    manager: &ConfigManager,
    config_type: &ConfigType,
    config_stack: &IndexMap<String, Vec<Rc<dyn Section>>>,
) -> Result<IndexMap<String, ConfigValue>> {
    let mut config = IndexMap::new();
    for (key, sections) in config_stack {
        let ty = match config_type.type_of(key) {
            Some(ty) => ty.clone(),
            None if config_type.allow_unknowns => TypeTag::Str,
            None => return Err(Error::configuration(format!("Type of {key:?} unknown"))),
        };
        let render_ty = ty.eager();

        let mut value = if render_ty.is_incremental() {
            render_incremental(manager, key, &render_ty, sections)?
        } else {
            render_first(manager, config_stack, key, &render_ty)?
                .ok_or_else(|| Error::configuration(format!("{key:?} not found")))?
        };

        if !ty.is_lazy() {
            value = collapse_refs(value).with_context(|| format!("Failed collapsing section key {key:?}"))?;
        }
        config.insert(key.clone(), value);
    }

    let missing: Vec<String> = config_type
        .required
        .iter()
        .filter(|name| !config.contains_key(name.as_str()))
        .map(|name| format!("{name:?}"))
        .collect();
    if !missing.is_empty() {
        return Err(Error::configuration(format!(
            "type {} needs settings for {}",
            config_type.callable.name(),
            missing.join(", ")
        )));
    }
    Ok(config)
}

/// Compose prepend/base/append parts across the chain.
///
/// Parts are gathered most specific first, stopping at the first section
/// providing a non-empty base, then folded least specific first.
fn render_incremental(
    manager: &ConfigManager,
    key: &str,
    ty: &TypeTag,
    sections: &[Rc<dyn Section>],
) -> Result<ConfigValue> {
    let mut data: Vec<Parts<ConfigValue>> = Vec::new();
    for section in sections {
        let parts = section.render_value(manager, key, ty)?.into_parts()?;
        let has_base = parts.base.as_ref().is_some_and(|b| !b.is_empty());
        data.push(parts);
        if has_base {
            break;
        }
    }

    let mut pieces: Vec<ConfigValue> = Vec::new();
    for parts in data.into_iter().rev() {
        if let Some(base) = parts.base.filter(|b| !b.is_empty()) {
            pieces = vec![base];
        }
        if let Some(prepend) = parts.prepend.filter(|p| !p.is_empty()) {
            pieces.insert(0, prepend);
        }
        if let Some(append) = parts.append.filter(|a| !a.is_empty()) {
            pieces.push(append);
        }
    }

    let value = match ty {
        TypeTag::Str => {
            let strings: Vec<String> = pieces
                .into_iter()
                .filter_map(|piece| match piece {
                    ConfigValue::Str(s) => Some(s),
                    _ => None,
                })
                .collect();
            ConfigValue::Str(strings.join(" "))
        }
        TypeTag::List => ConfigValue::List(
            pieces
                .into_iter()
                .flat_map(|piece| match piece {
                    ConfigValue::List(l) => l,
                    _ => Vec::new(),
                })
                .collect(),
        ),
        _ => ConfigValue::LazyRefs(
            pieces
                .into_iter()
                .flat_map(|piece| match piece {
                    ConfigValue::LazyRefs(refs) => refs,
                    ConfigValue::LazyRef(r) => vec![r],
                    _ => Vec::new(),
                })
                .collect(),
        ),
    };
    Ok(value)
}

/// Replace lazy references with their collapsed targets.
fn collapse_refs(value: ConfigValue) -> Result<ConfigValue> {
    let collapsed = match value {
        ConfigValue::LazyRef(r) => ConfigValue::Ref(r.collapse()?),
        ConfigValue::LazyRefs(refs) => ConfigValue::Refs(
            refs.iter()
                .map(LazyRef::collapse)
                .collect::<Result<_>>()?,
        ),
        other => other,
    };
    Ok(collapsed)
}
