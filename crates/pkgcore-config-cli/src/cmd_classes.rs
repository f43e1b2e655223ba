// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Implementation of the `pconfig classes` command.

use clap::Args;
use miette::Result;

/// List every class referenced by the configuration
#[derive(Debug, Args)]
pub struct CmdClasses {
    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdClasses {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.config.load()?;
        for class in pkgcore_config::dump::referenced_classes(&manager)? {
            println!("{class}");
        }
        Ok(0)
    }
}
