//! winupd common - update workflow, providers and run logging
//!
//! The workflow searches an update engine, filters out updates that need
//! user input or an unaccepted license, downloads and installs the rest,
//! and records every step in a per-run log file.

pub mod config;
pub mod error;
pub mod eula;
pub mod notifier;
pub mod privilege;
pub mod provider;
pub mod run_log;
pub mod update_types;
pub mod workflow;

pub use config::Config;
pub use error::{ConfigError, NotifyError, ProviderError, RunLogError, Stage, WinupdError};
pub use eula::{AutoAnswer, ConsolePrompt, EulaPolicy, EulaPrompt};
pub use notifier::{notify, NoopNotifier, Notifier, SmtpNotifier};
pub use privilege::{OsPrivilegeChecker, PrivilegeChecker, StaticPrivilege};
pub use provider::{FixtureProvider, ProviderKind, UpdateProvider, DEFAULT_SEARCH_FILTER};
pub use run_log::{LogEntry, LogLevel, RunLog};
pub use update_types::*;
pub use workflow::{InstallSummary, UpdateWorkflow, WorkflowOutcome};
