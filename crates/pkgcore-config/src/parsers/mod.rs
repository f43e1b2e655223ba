// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Text formats that produce [`ConfigSource`]s.
//!
//! Each format exposes `config_from_str(text, origin)` plus a
//! [`Configurable`] wrapping it, usable as the `parser` argument of
//! `pkgcore.config.basics.parse_config_file`.

use crate::configurable::{Configurable, Instance};
use crate::error::Result;
use crate::hint::ConfigHint;
use crate::manager::ConfigSource;
use crate::types::TypeTag;

pub mod dhcp;
pub mod ini;
pub mod mke2fs;
mod tokens;

pub use tokens::{Token, TokenSection};

/// Origin reported for text without a known source.
pub const UNKNOWN_ORIGIN: &str = "<unknown>";

/// Wrap a `config_from_str` style function as a configurable.
fn parser_configurable(name: &str, parse: fn(&str, &str) -> Result<ConfigSource>) -> Configurable {
    let hint = ConfigHint::new()
        .with_type("text", TypeTag::Str)
        .with_type("origin", TypeTag::Str)
        .required(["text"])
        .positional(["text"])
        .doc("Parse configuration text into a config source.")
        .authorative(true);
    Configurable::opaque(name, move |args| {
        let text = args.str("text")?;
        let origin = args.opt_str("origin")?.unwrap_or(UNKNOWN_ORIGIN);
        Ok(Some(Instance::new(parse(text, origin)?)))
    })
    .with_hint(hint)
}
