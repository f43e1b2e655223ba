// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! pkgcore-config - lazy, typed object construction from sectioned configuration
//!
//! This crate turns string-typed configuration stanzas (ini, dhcpd-style or
//! mke2fs-style files, or sections built in code) into a graph of lazily
//! constructed objects: repositories, caches, syncers, fetchers and anything
//! else registered as a [`Configurable`].
//!
//! # Overview
//!
//! A [`ConfigManager`] owns an ordered list of [`ConfigSource`]s. Asking it for
//! a section by name collapses that section: `inherit` chains are merged,
//! `key.prepend`/`key.append` parts are composed, every value is converted to
//! the type declared by the section's `class`, and references to other
//! sections are collapsed transitively. The resulting [`CollapsedConfig`] is
//! instantiated on demand and cached for the lifetime of the manager.
//!
//! # Example
//!
//! ```ini
//! [base]
//! inherit-only = true
//! cache = cold
//!
//! [gentoo]
//! class = pkgcore.ebuild.repository.tree
//! inherit = base
//! location = /var/db/repos/gentoo
//! ```
//!
//! ```rust,no_run
//! use pkgcore_config::{ConfigManager, Registry, parsers};
//!
//! # fn main() -> pkgcore_config::Result<()> {
//! let source = parsers::ini::config_from_str("[empty]\n", "<inline>")?;
//! let manager = ConfigManager::new(Registry::with_builtins(), [source])?;
//! for name in manager.objects("repo").names() {
//!     println!("repo: {name}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod basics;
pub mod collapse;
pub mod configurable;
pub mod convert;
pub mod dump;
pub mod error;
pub mod hint;
pub mod lazy_ref;
pub mod loader;
pub mod manager;
pub mod parsers;
pub mod section;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use collapse::CollapsedConfig;
pub use configurable::{Arg, ArgumentError, Arguments, Configurable, Instance, Param, Registry, Signature};
pub use error::{BoxError, Error, ErrorContext, ErrorKind, Result};
pub use hint::{ConfigHint, ConfigType, RESERVED_KEYS};
pub use lazy_ref::LazyRef;
pub use loader::{load_config, Format, LoadOptions};
pub use manager::{ConfigManager, ConfigSource, ManagerOptions, ObjectMap, WeakManager};
pub use section::{Conversion, DictSection, Parts, Rendered, Repr, Section};
pub use types::{ConfigValue, SectionRef, TypeTag, Value, ValueKind};

/// Typename of sections whose instance is an additional [`ConfigSource`].
pub const CONFIGSECTION_TYPENAME: &str = "configsection";

/// Typename of autoloaded sources that are not themselves scanned for autoloads.
pub const REMOTE_CONFIGSECTION_TYPENAME: &str = "remoteconfigsection";

/// Section-name prefix marking a section for autoloading.
pub const AUTOLOAD_PREFIX: &str = "autoload";
