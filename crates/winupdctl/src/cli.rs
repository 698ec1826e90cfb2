//! Command-line surface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use winupd_common::{EulaPolicy, ProviderKind};

use crate::VERSION;

#[derive(Parser, Debug)]
#[command(name = "winupdctl")]
#[command(about = "Search, download and install Windows updates", long_about = None)]
#[command(version = VERSION)]
pub struct Cli {
    /// Config file (default: $WINUPD_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level console output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the result as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search, accept, download and install updates (default)
    Run(RunArgs),

    /// List applicable updates without changing anything
    Search(SourceArgs),

    /// Show configuration
    Config {
        /// Print the built-in defaults instead of the effective config
        #[arg(long)]
        print_default: bool,
    },
}

/// Where updates come from
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Engine search predicate, passed through verbatim
    #[arg(long)]
    pub filter: Option<String>,

    /// Update provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// JSON fixture for the fixture provider
    #[arg(long)]
    pub fixture: Option<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// How to answer license prompts
    #[arg(long, value_enum)]
    pub eula: Option<EulaArg>,

    /// Directory for the run log
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Refuse to write into an existing log file
    #[arg(long)]
    pub no_clobber: bool,

    /// Treat the process as elevated (fixture provider only)
    #[arg(long)]
    pub skip_elevation_check: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderArg {
    Wua,
    Fixture,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Wua => ProviderKind::Wua,
            ProviderArg::Fixture => ProviderKind::Fixture,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EulaArg {
    Prompt,
    Accept,
    Decline,
}

impl From<EulaArg> for EulaPolicy {
    fn from(arg: EulaArg) -> Self {
        match arg {
            EulaArg::Prompt => EulaPolicy::Prompt,
            EulaArg::Accept => EulaPolicy::Accept,
            EulaArg::Decline => EulaPolicy::Decline,
        }
    }
}
