// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Locating, reading and parsing configuration files into a manager.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::configurable::Registry;
use crate::error::{Error, ErrorKind, Result};
use crate::manager::{ConfigManager, ConfigSource, ManagerOptions};
use crate::parsers;

#[cfg(test)]
#[path = "./loader_test.rs"]
mod loader_test;

/// System-wide configuration, used when present.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/pkgcore/pkgcore.conf";

/// The text formats a configuration file may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ini,
    Dhcp,
    Mke2fs,
}

impl Format {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ini" | "conf" => Some(Self::Ini),
            "dhcp" => Some(Self::Dhcp),
            "mke2fs" => Some(Self::Mke2fs),
            _ => None,
        }
    }

    /// Dotted name of the parser configurable for this format.
    pub fn configurable_name(&self) -> &'static str {
        match self {
            Self::Ini => parsers::ini::CONFIGURABLE_NAME,
            Self::Dhcp => parsers::dhcp::CONFIGURABLE_NAME,
            Self::Mke2fs => parsers::mke2fs::CONFIGURABLE_NAME,
        }
    }

    pub fn parse(&self, text: &str, origin: &str) -> Result<ConfigSource> {
        match self {
            Self::Ini => parsers::ini::config_from_str(text, origin),
            Self::Dhcp => parsers::dhcp::config_from_str(text, origin),
            Self::Mke2fs => parsers::mke2fs::config_from_str(text, origin),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ini" => Ok(Self::Ini),
            "dhcp" => Ok(Self::Dhcp),
            "mke2fs" => Ok(Self::Mke2fs),
            _ => Err(Error::configuration(format!(
                "unknown config format {s:?}, expected one of ini, dhcp, mke2fs"
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ini => f.write_str("ini"),
            Self::Dhcp => f.write_str("dhcp"),
            Self::Mke2fs => f.write_str("mke2fs"),
        }
    }
}

/// Where configuration comes from and how it is assembled.
///
/// Sources are layered highest priority first: `prepend_sources`, then
/// `files`, then the discovered user and system files, then
/// `append_sources`.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub prepend_sources: Vec<ConfigSource>,
    pub append_sources: Vec<ConfigSource>,
    /// Do not look for the user and system configuration files
    pub skip_config_files: bool,
    /// Explicit files, which must exist
    pub files: Vec<PathBuf>,
    /// Force a format instead of guessing from the extension
    pub format: Option<Format>,
    pub debug: bool,
}

/// The per-user configuration file, if a config directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pkgcore").join("pkgcore.conf"))
}

/// Configuration files that exist on this system, highest priority first.
pub fn default_config_files() -> Vec<PathBuf> {
    user_config_path()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(SYSTEM_CONFIG_PATH)))
        .filter(|path| {
            let found = path.is_file();
            if !found {
                tracing::debug!(path = %path.display(), "no config file");
            }
            found
        })
        .collect()
}

/// Read a whole configuration file.
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied {
                path: path.to_owned(),
                write: false,
                source: err,
            },
            _ => ErrorKind::Io {
                path: path.to_owned(),
                source: err,
            },
        };
        Error::new(kind)
    })
}

/// Read and parse one file.
///
/// Without an explicit format the extension decides, falling back to ini.
pub fn load_file(path: &Path, format: Option<Format>) -> Result<ConfigSource> {
    let path = dunce::canonicalize(path).map_err(|err| {
        Error::new(ErrorKind::Io {
            path: path.to_owned(),
            source: err,
        })
    })?;
    let format = format
        .or_else(|| Format::from_path(&path))
        .unwrap_or(Format::Ini);
    tracing::debug!(path = %path.display(), %format, "loading config file");
    let text = read_source(&path)?;
    format.parse(&text, &path.to_string_lossy())
}

/// Gather every source named by the options, highest priority first.
pub fn load_sources(options: &LoadOptions) -> Result<Vec<ConfigSource>> {
    let mut files = options.files.clone();
    if !options.skip_config_files {
        files.extend(default_config_files());
    }

    let mut sources = options.prepend_sources.clone();
    for file in &files {
        sources.push(load_file(file, options.format)?);
    }
    sources.extend(options.append_sources.iter().cloned());
    Ok(sources)
}

/// Build a manager from files on disk plus in-memory sources.
pub fn load_config(registry: Registry, options: &LoadOptions) -> Result<ConfigManager> {
    let sources = load_sources(options)?;
    tracing::debug!(sources = sources.len(), "loaded configuration sources");
    ConfigManager::with_options(
        registry,
        sources,
        ManagerOptions {
            debug: options.debug,
        },
    )
}
