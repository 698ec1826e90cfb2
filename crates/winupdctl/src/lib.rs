//! winupdctl - command-line front end for the winupd update workflow

pub mod cli;
pub mod commands;
pub mod output;

use anyhow::Result;

use cli::{Cli, Commands, RunArgs};

// Version is embedded at build time
pub const VERSION: &str = env!("WINUPD_VERSION");

/// Prefix of run log file names
pub const SCRIPT_NAME: &str = "winupdctl";

/// Exit code for configuration and startup errors
pub const EXIT_STARTUP_ERROR: i32 = 5;

/// Dispatch a parsed command line, returning the process exit code
pub fn dispatch(cli: &Cli) -> Result<i32> {
    let config = cli.config.as_deref();
    match &cli.command {
        None => commands::run(config, &RunArgs::default(), cli.json),
        Some(Commands::Run(args)) => commands::run(config, args, cli.json),
        Some(Commands::Search(source)) => commands::search(config, source, cli.json),
        Some(Commands::Config { print_default }) => commands::show_config(config, *print_default),
    }
}
