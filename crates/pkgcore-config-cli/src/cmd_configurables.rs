// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! Implementation of the `pconfig configurables` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use pkgcore_config::ConfigType;

/// List the registered configurables, optionally of one typename
#[derive(Debug, Args)]
pub struct CmdConfigurables {
    /// Only list configurables of this typename
    typename: Option<String>,

    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdConfigurables {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.config.load()?;
        for callable in manager.registry().iter() {
            let config_type = match ConfigType::new(callable.clone()) {
                Ok(config_type) => config_type,
                Err(err) => {
                    tracing::debug!(callable = callable.name(), error = %err, "skipping configurable");
                    continue;
                }
            };
            if self
                .typename
                .as_deref()
                .is_some_and(|typename| typename != config_type.name)
            {
                continue;
            }
            println!("{} {}", config_type.name.cyan(), callable.name());
            if let Some(doc) = &config_type.doc {
                println!("    {}", doc.trim().dimmed());
            }
        }
        Ok(0)
    }
}
