// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! dhcpd.conf-style configuration.
//!
//! ```text
//! gentoo {
//!     class pkgcore.ebuild.repository.tree;
//!     location "/var/db/repos/gentoo";
//!     cache { class pkgcore.cache.flat_hash.database; };
//! }
//! ```

use crate::configurable::Configurable;
use crate::error::Result;
use crate::manager::ConfigSource;

use super::tokens::{parse_sections, Dialect};

#[cfg(test)]
#[path = "./dhcp_test.rs"]
mod dhcp_test;

pub const CONFIGURABLE_NAME: &str = "pkgcore.config.dhcpformat.config_from_file";

pub fn configurable() -> Configurable {
    super::parser_configurable(CONFIGURABLE_NAME, config_from_str)
}

pub fn config_from_str(text: &str, origin: &str) -> Result<ConfigSource> {
    let mut source = ConfigSource::with_origin(origin);
    for (name, section) in parse_sections(text, origin, Dialect::Dhcp)? {
        source.insert(name, section);
    }
    tracing::debug!(origin, sections = source.len(), "parsed dhcp-style config");
    Ok(source)
}
