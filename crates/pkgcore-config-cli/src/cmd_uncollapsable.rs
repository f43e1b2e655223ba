// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Implementation of the `pconfig uncollapsable` command.

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Report the sections that fail to collapse
#[derive(Debug, Args)]
pub struct CmdUncollapsable {
    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdUncollapsable {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.config.load()?;
        let mut names = manager.sections();
        names.sort();
        for name in names {
            match manager.collapse_named_section(&name) {
                Ok(_) => {}
                Err(err) if err.is_inherit_only() => {}
                Err(err) => {
                    println!("{} {}", "section".bold(), name.red());
                    for line in err.to_string().lines() {
                        println!("    {line}");
                    }
                    println!();
                }
            }
        }
        Ok(0)
    }
}
