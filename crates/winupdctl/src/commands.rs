//! Subcommand handlers
//!
//! Each handler returns the process exit code.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::{debug, info};

use winupd_common::config::Config;
use winupd_common::eula::prompt_for_policy;
use winupd_common::notifier::{notify, SmtpNotifier};
use winupd_common::provider::{open_system_provider, FixtureProvider};
use winupd_common::{
    OsPrivilegeChecker, PrivilegeChecker, ProviderError, ProviderKind, RunLog, Stage,
    StaticPrivilege, UpdateProvider, UpdateWorkflow, WorkflowOutcome,
};

use crate::cli::{RunArgs, SourceArgs};
use crate::output;
use crate::{SCRIPT_NAME, VERSION};

/// Load the config file and apply command-line overrides
pub fn effective_config(config_path: Option<&Path>, source: &SourceArgs) -> Result<Config> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;

    if let Some(filter) = &source.filter {
        config.search.filter = filter.clone();
    }
    if let Some(provider) = source.provider {
        config.search.provider = provider.into();
    }
    if let Some(fixture) = &source.fixture {
        config.search.fixture = Some(fixture.clone());
        // a fixture path alone implies the fixture provider
        if source.provider.is_none() {
            config.search.provider = ProviderKind::Fixture;
        }
    }

    Ok(config)
}

fn open_provider(config: &Config) -> Result<Box<dyn UpdateProvider>, ProviderError> {
    match config.search.provider {
        ProviderKind::Wua => open_system_provider(),
        ProviderKind::Fixture => {
            let path = config.search.fixture.as_deref().ok_or_else(|| {
                ProviderError::Fixture("no fixture file configured".to_string())
            })?;
            Ok(Box::new(FixtureProvider::from_path(path)?))
        }
    }
}

/// `winupdctl run`
pub fn run(config_path: Option<&Path>, args: &RunArgs, json: bool) -> Result<i32> {
    let mut config = effective_config(config_path, &args.source)?;
    if let Some(eula) = args.eula {
        config.eula.policy = eula.into();
    }
    if let Some(dir) = &args.log_dir {
        config.log.dir = dir.clone();
    }
    config.log.no_clobber |= args.no_clobber;
    config.validate().context("Invalid configuration")?;

    if args.skip_elevation_check && config.search.provider != ProviderKind::Fixture {
        bail!("--skip-elevation-check is only allowed with the fixture provider");
    }

    let log = RunLog::for_run(
        &config.log.dir,
        SCRIPT_NAME,
        Local::now(),
        config.log.no_clobber,
    );
    info!("Run log: {}", log.path().display());
    log.info(&format!(
        "{} {} starting (provider: {}, eula policy: {})",
        SCRIPT_NAME,
        VERSION,
        config.search.provider.as_str(),
        config.eula.policy.as_str()
    ));

    let privilege: Box<dyn PrivilegeChecker> = if args.skip_elevation_check {
        log.warn("Elevation check skipped");
        Box::new(StaticPrivilege(true))
    } else {
        Box::new(OsPrivilegeChecker)
    };

    let workflow = UpdateWorkflow::new(&log, config.search.filter.clone());
    let preflight = match workflow.preflight(privilege.as_ref()) {
        Ok(outcome) => outcome,
        Err(e) => {
            log.error(&format!("Cannot determine elevation: {}", e));
            return Err(e).context("Privilege check failed");
        }
    };

    let outcome = match preflight {
        Some(outcome) => outcome,
        None => match open_provider(&config) {
            Ok(mut provider) => {
                let mut prompt = prompt_for_policy(config.eula.policy);
                workflow.execute(provider.as_mut(), prompt.as_mut())
            }
            Err(e) => workflow.provider_failed(Stage::Search, e),
        },
    };

    send_notifications(&config, &log, &outcome);
    log.info(&format!(
        "Run finished: {} (exit code {})",
        outcome.label(),
        outcome.exit_code()
    ));

    if json {
        output::print_json(&outcome)?;
    } else {
        output::print_outcome(&outcome, log.path());
    }
    Ok(outcome.exit_code())
}

fn send_notifications(config: &Config, log: &RunLog, outcome: &WorkflowOutcome) {
    let notify_config = &config.notify;
    if !notify_config.enabled {
        return;
    }

    let wanted = match outcome {
        WorkflowOutcome::ProviderFailed { .. } => notify_config.on_failure,
        WorkflowOutcome::Completed(_) => notify_config.on_completion,
        _ => false,
    };
    if !wanted {
        debug!("No notification for outcome '{}'", outcome.label());
        return;
    }

    let notifier = match SmtpNotifier::from_config(notify_config) {
        Ok(notifier) => notifier,
        Err(e) => {
            log.error(&format!("Notification not sent: {}", e));
            return;
        }
    };

    let (subject, body) = output::notification_text(outcome, &host_name(), log.path());
    notify(&notifier, log, &subject, &body);
}

fn host_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "this host".to_string())
}

/// `winupdctl search`
pub fn search(config_path: Option<&Path>, source: &SourceArgs, json: bool) -> Result<i32> {
    let config = effective_config(config_path, source)?;
    config.validate().context("Invalid configuration")?;

    let mut provider = open_provider(&config).context("Cannot open update provider")?;
    let found = provider
        .search(&config.search.filter)
        .context("Update search failed")?;

    if json {
        output::print_json(found.items())?;
    } else {
        output::print_search(&found);
    }
    Ok(0)
}

/// `winupdctl config`
pub fn show_config(config_path: Option<&Path>, print_default: bool) -> Result<i32> {
    let config = if print_default {
        Config::default()
    } else {
        Config::load(config_path).context("Failed to load configuration")?
    };
    print!("{}", config.to_toml()?);
    Ok(0)
}
