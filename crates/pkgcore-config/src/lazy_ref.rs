// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::collapse::CollapsedConfig;
use crate::configurable::Instance;
use crate::error::{Error, Result};
use crate::manager::{ConfigManager, WeakManager};
use crate::section::Section;
use crate::types::SectionRef;

#[cfg(test)]
#[path = "./lazy_ref_test.rs"]
mod lazy_ref_test;

enum State {
    Unresolved,
    Resolving,
    Resolved(Rc<CollapsedConfig>),
    Failed(Error),
}

struct Inner {
    manager: WeakManager,
    typename: String,
    target: SectionRef,
    state: RefCell<State>,
}

/// A deferred reference to another section.
///
/// Collapsing is memoized, and the collapsed section must be of the
/// expected typename.
#[derive(Clone)]
pub struct LazyRef(Rc<Inner>);

impl LazyRef {
    /// Reference resolved through [`ConfigManager::collapse_named_section`].
    pub fn named(
        manager: &ConfigManager,
        typename: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::from_section_ref(manager, typename, SectionRef::Named(name.into()))
    }

    /// Reference to a section embedded in another one.
    pub fn anonymous(
        manager: &ConfigManager,
        typename: impl Into<String>,
        section: Rc<dyn Section>,
    ) -> Self {
        Self::from_section_ref(manager, typename, SectionRef::Inline(section))
    }

    pub fn from_section_ref(
        manager: &ConfigManager,
        typename: impl Into<String>,
        target: SectionRef,
    ) -> Self {
        Self(Rc::new(Inner {
            manager: manager.downgrade(),
            typename: typename.into(),
            target,
            state: RefCell::new(State::Unresolved),
        }))
    }

    /// Name of the referenced section, `None` for inline sections.
    pub fn name(&self) -> Option<&str> {
        match &self.0.target {
            SectionRef::Named(name) => Some(name),
            SectionRef::Inline(_) => None,
        }
    }

    pub fn typename(&self) -> &str {
        &self.0.typename
    }

    pub fn target(&self) -> &SectionRef {
        &self.0.target
    }

    fn describe(&self) -> String {
        match self.name() {
            Some(name) => format!("{name:?}"),
            None => "<anonymous section>".to_string(),
        }
    }

    pub fn collapse(&self) -> Result<Rc<CollapsedConfig>> {
        match &*self.0.state.borrow() {
            State::Resolved(config) => return Ok(Rc::clone(config)),
            State::Resolving => {
                return Err(Error::configuration(format!(
                    "Reference to {} is recursive",
                    self.describe()
                )));
            }
            State::Failed(err) => return Err(err.duplicate()),
            State::Unresolved => {}
        }

        self.0.state.replace(State::Resolving);
        let result = self.resolve();
        let state = match &result {
            Ok(config) => State::Resolved(Rc::clone(config)),
            Err(err) => State::Failed(err.duplicate()),
        };
        self.0.state.replace(state);
        result
    }

    fn resolve(&self) -> Result<Rc<CollapsedConfig>> {
        let manager = self.0.manager.upgrade()?;
        tracing::trace!(reference = %self.describe(), typename = %self.0.typename, "resolving reference");
        let config = match &self.0.target {
            SectionRef::Named(name) => manager.collapse_named_section(name)?,
            SectionRef::Inline(section) => manager.collapse_section(&[Rc::clone(section)], None)?,
        };
        if config.type_name() != self.0.typename {
            return Err(Error::configuration(format!(
                "reference {} should point to a {:?}, got {:?}",
                self.describe(),
                self.0.typename,
                config.type_name()
            )));
        }
        Ok(config)
    }

    /// Collapse and construct the referenced section.
    pub fn instantiate(&self) -> Result<Instance> {
        self.collapse()?.instantiate()
    }
}

impl fmt::Debug for LazyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazyRef({} of type {:?})", self.describe(), self.0.typename)
    }
}
