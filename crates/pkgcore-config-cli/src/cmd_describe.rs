// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Implementation of the `pconfig describe-class` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use pkgcore_config::ConfigType;

/// Describe the parameters a class accepts
#[derive(Debug, Args)]
pub struct CmdDescribeClass {
    /// Dotted name of the class, as used in `class` values
    class: String,

    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdDescribeClass {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.config.load()?;
        let callable = manager.registry().resolve(&self.class)?;
        let config_type = match ConfigType::new(callable) {
            Ok(config_type) => config_type,
            Err(err) => {
                tracing::debug!(class = %self.class, error = %err, "failed describing class");
                println!("{}", "Not a valid type!".red());
                return Ok(1);
            }
        };
        print!("{}", pkgcore_config::dump::describe_type(&config_type));
        Ok(0)
    }
}
