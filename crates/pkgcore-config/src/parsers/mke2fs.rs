// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! mke2fs.conf-style configuration.
//!
//! ```text
//! [gentoo]
//!     class = pkgcore.ebuild.repository.tree
//!     cache = {
//!         class = pkgcore.cache.flat_hash.database
//!     }
//! ```

use crate::configurable::Configurable;
use crate::error::Result;
use crate::manager::ConfigSource;

use super::tokens::{parse_sections, Dialect};

#[cfg(test)]
#[path = "./mke2fs_test.rs"]
mod mke2fs_test;

pub const CONFIGURABLE_NAME: &str = "pkgcore.config.mke2fsformat.config_from_file";

pub fn configurable() -> Configurable {
    super::parser_configurable(CONFIGURABLE_NAME, config_from_str)
}

pub fn config_from_str(text: &str, origin: &str) -> Result<ConfigSource> {
    let mut source = ConfigSource::with_origin(origin);
    for (name, section) in parse_sections(text, origin, Dialect::Mke2fs)? {
        source.insert(name, section);
    }
    tracing::debug!(origin, sections = source.len(), "parsed mke2fs-style config");
    Ok(source)
}
