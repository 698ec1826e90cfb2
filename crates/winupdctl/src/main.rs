//! winupdctl - search, download and install Windows updates
//!
//! Exit codes: 0 completed, 1 not elevated, 2 nothing to do,
//! 3 provider failure, 4 nothing downloaded, 5 startup error.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use winupdctl::cli::Cli;
use winupdctl::{dispatch, EXIT_STARTUP_ERROR};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_STARTUP_ERROR
        }
    };
    ExitCode::from(code as u8)
}
