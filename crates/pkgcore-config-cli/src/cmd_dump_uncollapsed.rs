// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Implementation of the `pconfig dump-uncollapsed` command.

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Dump every section as written, before collapsing
#[derive(Debug, Args)]
pub struct CmdDumpUncollapsed {
    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdDumpUncollapsed {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.config.load()?;
        for (index, source) in manager.sources().iter().enumerate() {
            let origin = source.origin().unwrap_or("<unknown>");
            println!("{}", format!("# source {}: {origin}", index + 1).bold());
            for (name, section) in source.iter() {
                println!();
                print!(
                    "{}",
                    pkgcore_config::dump::dump_uncollapsed(&manager, name, section.as_ref())?
                );
            }
            println!();
        }
        Ok(0)
    }
}
