// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! The configuration manager: owns sources, caches collapsed sections and
//! runs autoloads.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::collapse::{self, CollapsedConfig};
use crate::configurable::{Instance, Registry};
use crate::error::{Error, ErrorContext, Result};
use crate::section::Section;
use crate::{AUTOLOAD_PREFIX, CONFIGSECTION_TYPENAME, REMOTE_CONFIGSECTION_TYPENAME};

#[cfg(test)]
#[path = "./manager_test.rs"]
mod manager_test;

/// Options that apply to a whole manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerOptions {
    /// Pass errors from configured callables through unwrapped
    pub debug: bool,
}

/// An ordered mapping of section name to section.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    origin: Option<String>,
    sections: IndexMap<String, Rc<dyn Section>>,
}

impl ConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source remembering where it was read from.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            sections: IndexMap::new(),
        }
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn insert<S: Section + 'static>(&mut self, name: impl Into<String>, section: S) {
        self.insert_rc(name, Rc::new(section));
    }

    pub fn insert_rc(&mut self, name: impl Into<String>, section: Rc<dyn Section>) {
        self.sections.insert(name.into(), section);
    }

    pub fn with<S: Section + 'static>(mut self, name: impl Into<String>, section: S) -> Self {
        self.insert(name, section);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Rc<dyn Section>> {
        self.sections.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<dyn Section>)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Rc<dyn Section>)> for ConfigSource {
    fn from_iter<I: IntoIterator<Item = (K, Rc<dyn Section>)>>(iter: I) -> Self {
        Self {
            origin: None,
            sections: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Typename to (section name to collapsed section).
pub type TypeMap = IndexMap<String, IndexMap<String, Rc<CollapsedConfig>>>;

#[derive(Default)]
struct State {
    sources: Vec<Rc<ConfigSource>>,
    /// Section name to every section of that name, highest priority first
    lookup: IndexMap<String, Vec<Rc<dyn Section>>>,
    rendered: HashMap<String, Rc<CollapsedConfig>>,
    types: Option<Rc<TypeMap>>,
}

struct Inner {
    registry: Registry,
    original_sources: Vec<Rc<ConfigSource>>,
    debug: bool,
    state: RefCell<State>,
    in_flight: RefCell<HashSet<String>>,
}

/// Marks a section name as being collapsed for the guard's lifetime.
struct InFlight<'a> {
    names: &'a RefCell<HashSet<String>>,
    name: String,
}

impl<'a> InFlight<'a> {
    fn enter(names: &'a RefCell<HashSet<String>>, name: &str) -> Result<Self> {
        if !names.borrow_mut().insert(name.to_string()) {
            return Err(Error::configuration(format!(
                "Reference to {name:?} is recursive"
            )));
        }
        Ok(Self {
            names,
            name: name.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.names.borrow_mut().remove(&self.name);
    }
}

/// Entry point for collapsing and instantiating configuration.
///
/// Cloning is cheap; clones share the same sources and caches.
#[derive(Clone)]
pub struct ConfigManager {
    inner: Rc<Inner>,
}

/// A non-owning handle held by collapsed sections and references.
#[derive(Clone)]
pub struct WeakManager {
    inner: Weak<Inner>,
}

impl WeakManager {
    pub fn upgrade(&self) -> Result<ConfigManager> {
        self.inner
            .upgrade()
            .map(|inner| ConfigManager { inner })
            .ok_or_else(|| Error::configuration("the config manager is no longer in memory"))
    }
}

impl fmt::Debug for WeakManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakManager")
    }
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ConfigManager")
            .field("sources", &state.sources.len())
            .field("sections", &state.lookup.len())
            .field("debug", &self.inner.debug)
            .finish()
    }
}

impl ConfigManager {
    pub fn new<I>(registry: Registry, sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = ConfigSource>,
    {
        Self::with_options(registry, sources, ManagerOptions::default())
    }

    pub fn with_options<I>(registry: Registry, sources: I, options: ManagerOptions) -> Result<Self>
    where
        I: IntoIterator<Item = ConfigSource>,
    {
        let manager = Self {
            inner: Rc::new(Inner {
                registry,
                original_sources: sources.into_iter().map(Rc::new).collect(),
                debug: options.debug,
                state: RefCell::new(State::default()),
                in_flight: RefCell::new(HashSet::new()),
            }),
        };
        manager.reload()?;
        Ok(manager)
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn debug(&self) -> bool {
        self.inner.debug
    }

    pub fn downgrade(&self) -> WeakManager {
        WeakManager {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Throw away every cached section and instance and rerun autoloads.
    ///
    /// On failure the previous state is kept.
    pub fn reload(&self) -> Result<()> {
        tracing::debug!(sources = self.inner.original_sources.len(), "reloading configuration");
        let previous = self.inner.state.replace(State::default());
        for source in &self.inner.original_sources {
            if let Err(err) = self.add_source(Rc::clone(source), true) {
                self.inner.state.replace(previous);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Add a source after the existing ones and run its autoloads.
    pub fn add_config_source(&self, source: ConfigSource) -> Result<()> {
        self.add_source(Rc::new(source), true)
    }

    fn add_source(&self, source: Rc<ConfigSource>, scan_autoloads: bool) -> Result<()> {
        {
            let mut state = self.inner.state.borrow_mut();
            let mut collisions: Vec<&str> = source
                .names()
                .filter(|name| state.rendered.contains_key(*name))
                .collect();
            if !collisions.is_empty() {
                collisions.sort_unstable();
                let names: Vec<String> = collisions.iter().map(|n| format!("{n:?}")).collect();
                return Err(Error::configuration(format!(
                    "New config is trying to modify existing section(s) {} that was already instantiated.",
                    names.join(", ")
                )));
            }

            state.sources.push(Rc::clone(&source));
            for (name, section) in source.iter() {
                state
                    .lookup
                    .entry(name.to_string())
                    .or_default()
                    .push(Rc::clone(section));
            }
            state.types = None;
        }

        if !scan_autoloads {
            return Ok(());
        }
        for name in source.names().filter(|n| n.starts_with(AUTOLOAD_PREFIX)) {
            self.autoload(name)?;
        }
        Ok(())
    }

    fn autoload(&self, name: &str) -> Result<()> {
        let collapsed = match self.collapse_named_section(name) {
            Ok(collapsed) => collapsed,
            Err(err) if err.is_inherit_only() => return Ok(()),
            Err(err) => return Err(err),
        };
        let scan = match collapsed.type_name() {
            CONFIGSECTION_TYPENAME => true,
            REMOTE_CONFIGSECTION_TYPENAME => false,
            other => {
                return Err(Error::configuration(format!(
                    "Section {name:?} is marked as autoload but type is {other}, not {CONFIGSECTION_TYPENAME}"
                )));
            }
        };
        let instance = collapsed
            .instantiate()
            .with_context(|| format!("Instantiating autoload {name:?}"))?;
        let source = instance.downcast::<ConfigSource>().ok_or_else(|| {
            Error::configuration(format!(
                "autoload {name:?} produced {} instead of a config source",
                instance.type_name()
            ))
        })?;
        tracing::debug!(autoload = name, sections = source.len(), "adding autoloaded config source");
        self.add_source(source, scan)
    }

    /// Every section of this name, highest priority first.
    pub fn section_stack(&self, name: &str) -> Option<Vec<Rc<dyn Section>>> {
        self.inner.state.borrow().lookup.get(name).cloned()
    }

    /// Collapse a section by name, reusing an earlier result.
    pub fn collapse_named_section(&self, name: &str) -> Result<Rc<CollapsedConfig>> {
        self.collapse_named_section_if_present(name)?
            .ok_or_else(|| Error::configuration(format!("no section called {name:?}")))
    }

    /// Like [`Self::collapse_named_section`], but `None` when no source has the name.
    pub fn collapse_named_section_if_present(&self, name: &str) -> Result<Option<Rc<CollapsedConfig>>> {
        let _guard = InFlight::enter(&self.inner.in_flight, name)?;

        let cached = self.inner.state.borrow().rendered.get(name).cloned();
        if let Some(collapsed) = cached {
            return Ok(Some(collapsed));
        }
        let Some(stack) = self.section_stack(name) else {
            return Ok(None);
        };

        let collapsed = collapse::collapse_section(self, &stack, Some(name))
            .with_context(|| format!("Collapsing section named {name:?}"))?;
        let collapsed = Rc::new(collapsed);
        self.inner
            .state
            .borrow_mut()
            .rendered
            .insert(name.to_string(), Rc::clone(&collapsed));
        Ok(Some(collapsed))
    }

    /// Collapse sections directly, bypassing the name cache.
    ///
    /// `sections` holds same-named sections, highest priority first; one
    /// section is the common case for inline sections.
    pub fn collapse_section(
        &self,
        sections: &[Rc<dyn Section>],
        name: Option<&str>,
    ) -> Result<Rc<CollapsedConfig>> {
        collapse::collapse_section(self, sections, name).map(Rc::new)
    }

    /// Every known section name, in first-seen order.
    pub fn sections(&self) -> Vec<String> {
        self.inner.state.borrow().lookup.keys().cloned().collect()
    }

    /// The active sources, including those added by autoloads.
    pub fn sources(&self) -> Vec<Rc<ConfigSource>> {
        self.inner.state.borrow().sources.clone()
    }

    /// Every collapsible section grouped by typename.
    pub fn types(&self) -> Result<Rc<TypeMap>> {
        if let Some(types) = self.inner.state.borrow().types.clone() {
            return Ok(types);
        }
        let mut types = TypeMap::new();
        for name in self.sections() {
            let collapsed = match self.collapse_named_section(&name) {
                Ok(collapsed) => collapsed,
                Err(err) if err.is_inherit_only() => {
                    tracing::trace!(section = %name, "skipping inherit-only section");
                    continue;
                }
                Err(err) => return Err(err),
            };
            types
                .entry(collapsed.type_name().to_string())
                .or_default()
                .insert(name, collapsed);
        }
        let types = Rc::new(types);
        self.inner.state.borrow_mut().types = Some(Rc::clone(&types));
        Ok(types)
    }

    /// Instantiate the single section of `typename` flagged `default`.
    pub fn get_default(&self, typename: &str) -> Result<Option<Instance>> {
        let types = self
            .types()
            .with_context(|| format!("Collapsing defaults for {typename:?}"))?;
        let mut defaults: Vec<(&String, &Rc<CollapsedConfig>)> = types
            .get(typename)
            .into_iter()
            .flatten()
            .filter(|(_, collapsed)| collapsed.is_default())
            .collect();

        match defaults.len() {
            0 => Ok(None),
            1 => {
                let (name, collapsed) = defaults[0];
                collapsed
                    .instantiate()
                    .with_context(|| format!("failed instantiating default {typename} {name:?}"))
                    .map(Some)
            }
            _ => {
                defaults.sort_by(|a, b| a.0.cmp(b.0));
                let names: Vec<String> = defaults.iter().map(|(n, _)| format!("{n:?}")).collect();
                Err(Error::configuration(format!(
                    "type {typename} incorrectly has multiple default sections: {}",
                    names.join(", ")
                )))
            }
        }
    }

    /// A live view of the instantiable sections of one typename.
    pub fn objects(&self, typename: impl Into<String>) -> ObjectMap {
        ObjectMap {
            manager: self.clone(),
            typename: typename.into(),
        }
    }
}

/// The sections of one typename, instantiated on access.
#[derive(Debug, Clone)]
pub struct ObjectMap {
    manager: ConfigManager,
    typename: String,
}

impl ObjectMap {
    pub fn typename(&self) -> &str {
        &self.typename
    }

    fn collapse(&self, name: &str) -> Result<Option<Rc<CollapsedConfig>>> {
        Ok(self
            .manager
            .collapse_named_section_if_present(name)?
            .filter(|collapsed| collapsed.type_name() == self.typename))
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.collapse(name)?.is_some())
    }

    /// Instantiate `name` if it exists and has this typename.
    pub fn get(&self, name: &str) -> Result<Option<Instance>> {
        self.collapse(name)?
            .map(|collapsed| collapsed.instantiate())
            .transpose()
    }

    /// Names of the sections with this typename.
    ///
    /// Sections that fail to collapse are skipped.
    pub fn names(&self) -> Vec<String> {
        self.manager
            .sections()
            .into_iter()
            .filter(|name| match self.collapse(name) {
                Ok(found) => found.is_some(),
                Err(err) => {
                    tracing::debug!(section = %name, error = %err, "skipping uncollapsable section");
                    false
                }
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (String, Result<Instance>)> + '_ {
        self.names().into_iter().map(|name| {
            let instance = self.get(&name).and_then(|found| {
                found.ok_or_else(|| Error::configuration(format!("no section called {name:?}")))
            });
            (name, instance)
        })
    }
}
