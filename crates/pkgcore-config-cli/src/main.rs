// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

//! pconfig - inspect pkgcore configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use pkgcore_config::{load_config, ConfigManager, Format, LoadOptions, Registry};

mod cmd_classes;
mod cmd_configurables;
mod cmd_describe;
mod cmd_dump;
mod cmd_dump_uncollapsed;
mod cmd_uncollapsable;

use cmd_classes::CmdClasses;
use cmd_configurables::CmdConfigurables;
use cmd_describe::CmdDescribeClass;
use cmd_dump::CmdDump;
use cmd_dump_uncollapsed::CmdDumpUncollapsed;
use cmd_uncollapsable::CmdUncollapsable;


#[derive(Parser)]
#[clap(
    name = "pconfig",
    about = "Inspect pkgcore configuration",
    version,
    long_about = "Query and dump the configuration sections, types and classes known to pkgcore"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Where configuration is read from
#[derive(Parser, Clone, Debug, Default)]
pub struct ConfigFlags {
    /// Additional config file to load, highest priority first
    #[clap(long = "config", short = 'c', env = "PCONFIG_CONFIG", value_delimiter = ':')]
    pub config: Vec<PathBuf>,

    /// Format of the config files (ini, dhcp, mke2fs), guessed from the extension by default
    #[clap(long)]
    pub format: Option<Format>,

    /// Do not load the user and system configuration files
    #[clap(long = "no-default-config", env = "PCONFIG_NO_DEFAULT_CONFIG")]
    pub no_default_config: bool,

    /// Pass errors from configured objects through unwrapped
    #[clap(long, env = "PCONFIG_DEBUG")]
    pub debug: bool,
}

impl ConfigFlags {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            files: self.config.clone(),
            format: self.format,
            skip_config_files: self.no_default_config,
            debug: self.debug,
            ..Default::default()
        }
    }

    /// Build the manager over the builtin configurables.
    pub fn load(&self) -> Result<ConfigManager> {
        let manager = load_config(Registry::with_builtins(), &self.load_options())?;
        Ok(manager)
    }
}

#[derive(Subcommand)]
enum Command {
    /// List every class referenced by the configuration
    Classes(CmdClasses),

    /// Describe the parameters a class accepts
    DescribeClass(CmdDescribeClass),

    /// List the registered configurables, optionally of one typename
    Configurables(CmdConfigurables),

    /// Dump collapsed sections, optionally of one typename
    Dump(CmdDump),

    /// Dump every section as written, before collapsing
    DumpUncollapsed(CmdDumpUncollapsed),

    /// Report the sections that fail to collapse
    Uncollapsable(CmdUncollapsable),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Classes(mut cmd) => cmd.run(),
            Command::DescribeClass(mut cmd) => cmd.run(),
            Command::Configurables(mut cmd) => cmd.run(),
            Command::Dump(mut cmd) => cmd.run(),
            Command::DumpUncollapsed(mut cmd) => cmd.run(),
            Command::Uncollapsable(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
