// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! ini-style configuration.
//!
//! ```ini
//! [DEFAULT]
//! root = /
//!
//! [gentoo]
//! class = pkgcore.ebuild.repository.tree
//! location: /var/db/repos/gentoo
//! masters = base
//!     extra
//! ```
//!
//! Values in `[DEFAULT]` are visible in every section. Lines starting with
//! whitespace continue the previous value, joined with a newline. Key case
//! is preserved.

use indexmap::IndexMap;

use crate::configurable::Configurable;
use crate::error::{Error, Result};
use crate::manager::ConfigSource;
use crate::section::DictSection;

#[cfg(test)]
#[path = "./ini_test.rs"]
mod ini_test;

pub const CONFIGURABLE_NAME: &str = "pkgcore.config.cparser.config_from_file";

const DEFAULT_SECTION: &str = "DEFAULT";

pub fn configurable() -> Configurable {
    super::parser_configurable(CONFIGURABLE_NAME, config_from_str)
}

enum Target {
    Defaults,
    Section(String),
}

pub fn config_from_str(text: &str, origin: &str) -> Result<ConfigSource> {
    let error = |line: usize, message: String| Error::parsing(origin, Some(line), message);

    let mut defaults: IndexMap<String, String> = IndexMap::new();
    let mut sections: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
    let mut current: Option<Target> = None;
    let mut last_key: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let lineno = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            last_key = None;
            continue;
        }
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let values = match &current {
            Some(Target::Defaults) => Some(&mut defaults),
            Some(Target::Section(name)) => sections.get_mut(name),
            None => None,
        };

        if raw.starts_with(char::is_whitespace) {
            if let (Some(key), Some(values)) = (&last_key, values) {
                if let Some(value) = values.get_mut(key) {
                    value.push('\n');
                    value.push_str(line);
                    continue;
                }
            }
        }

        if line.starts_with('[') {
            let name = line
                .strip_prefix('[')
                .and_then(|l| l.strip_suffix(']'))
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| error(lineno, format!("malformed section header {line:?}")))?;
            last_key = None;
            if name == DEFAULT_SECTION {
                current = Some(Target::Defaults);
                continue;
            }
            if sections.contains_key(name) {
                return Err(error(lineno, format!("section {name:?} already exists")));
            }
            sections.insert(name.to_string(), IndexMap::new());
            current = Some(Target::Section(name.to_string()));
            continue;
        }

        let (section_name, values) = match &current {
            Some(Target::Defaults) => (DEFAULT_SECTION, Some(&mut defaults)),
            Some(Target::Section(name)) => (name.as_str(), sections.get_mut(name)),
            None => {
                return Err(error(lineno, "file contains no section headers".to_string()));
            }
        };
        let values = values.ok_or_else(|| error(lineno, "lost track of the current section".to_string()))?;

        let (key, value) = line
            .split_once(['=', ':'])
            .ok_or_else(|| error(lineno, format!("expected 'key = value', got {line:?}")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(error(lineno, format!("missing key in {line:?}")));
        }
        if values.contains_key(key) {
            return Err(error(
                lineno,
                format!("option {key:?} in section {section_name:?} already exists"),
            ));
        }
        values.insert(key.to_string(), value.trim().to_string());
        last_key = Some(key.to_string());
    }

    let mut source = ConfigSource::with_origin(origin);
    for (name, values) in sections {
        let mut merged = defaults.clone();
        merged.extend(values);
        source.insert(name, DictSection::strings(merged));
    }
    tracing::debug!(origin, sections = source.len(), "parsed ini config");
    Ok(source)
}
