// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Implementation of the `pconfig dump` command.

use clap::Args;
use miette::Result;

/// Dump collapsed sections, optionally of one typename
#[derive(Debug, Args)]
pub struct CmdDump {
    /// Only dump sections of this typename
    typename: Option<String>,

    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdDump {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.config.load()?;
        let mut names = manager.sections();
        names.sort();

        let mut first = true;
        for name in names {
            let collapsed = match manager.collapse_named_section(&name) {
                Ok(collapsed) => collapsed,
                Err(err) if err.is_inherit_only() => continue,
                Err(err) => return Err(err.into()),
            };
            if self
                .typename
                .as_deref()
                .is_some_and(|typename| typename != collapsed.type_name())
            {
                continue;
            }
            if !first {
                println!();
            }
            first = false;
            print!("{}", pkgcore_config::dump::dump_collapsed(&name, &collapsed)?);
        }
        Ok(0)
    }
}
