//! Update workflow
//!
//! privilege check -> search -> select -> download -> install -> report
//!
//! Stages run strictly in sequence against one provider. Every decision is
//! written to the run log. Provider failures end the run with
//! [`WorkflowOutcome::ProviderFailed`]; a failed privilege query is the only
//! `Err`.

use serde::Serialize;

use crate::eula::EulaPrompt;
use crate::error::{ProviderError, Stage, WinupdError};
use crate::privilege::PrivilegeChecker;
use crate::provider::UpdateProvider;
use crate::run_log::RunLog;
use crate::update_types::{InstallSet, ResultCode, SelectionSet, UpdateItem, UpdateSearchResult};

/// Why an update was left out of the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    RequiresUserInput,
    EulaDeclined,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::RequiresUserInput => "requires user input",
            SkipReason::EulaDeclined => "license agreement declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUpdate {
    pub id: String,
    pub title: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub title: String,
    pub result: ResultCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    pub result_code: ResultCode,
    pub reboot_required: bool,
    pub reboot_may_be_required: bool,
    pub items: Vec<ItemReport>,
    pub skipped: Vec<SkippedUpdate>,
}

impl InstallSummary {
    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|i| !i.result.is_success()).count()
    }
}

/// Terminal state of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    NotElevated,
    NoApplicableUpdates,
    AllSkipped { skipped: Vec<SkippedUpdate> },
    NothingDownloaded { selected: usize },
    ProviderFailed { stage: Stage, message: String },
    Completed(InstallSummary),
}

impl WorkflowOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowOutcome::Completed(_) => 0,
            WorkflowOutcome::NotElevated => 1,
            WorkflowOutcome::NoApplicableUpdates | WorkflowOutcome::AllSkipped { .. } => 2,
            WorkflowOutcome::ProviderFailed { .. } => 3,
            WorkflowOutcome::NothingDownloaded { .. } => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowOutcome::NotElevated => "not elevated",
            WorkflowOutcome::NoApplicableUpdates => "no applicable updates",
            WorkflowOutcome::AllSkipped { .. } => "all updates skipped",
            WorkflowOutcome::NothingDownloaded { .. } => "nothing downloaded",
            WorkflowOutcome::ProviderFailed { .. } => "provider failed",
            WorkflowOutcome::Completed(_) => "completed",
        }
    }
}

/// Result of the selection policy
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub selected: SelectionSet,
    pub skipped: Vec<SkippedUpdate>,
}

/// One update run against a provider
pub struct UpdateWorkflow<'a> {
    log: &'a RunLog,
    filter: String,
}

impl<'a> UpdateWorkflow<'a> {
    pub fn new(log: &'a RunLog, filter: impl Into<String>) -> Self {
        Self {
            log,
            filter: filter.into(),
        }
    }

    /// Full run: [`Self::preflight`] then [`Self::execute`]
    pub fn run(
        &self,
        privilege: &dyn PrivilegeChecker,
        provider: &mut dyn UpdateProvider,
        prompt: &mut dyn EulaPrompt,
    ) -> Result<WorkflowOutcome, WinupdError> {
        if let Some(outcome) = self.preflight(privilege)? {
            return Ok(outcome);
        }
        Ok(self.execute(provider, prompt))
    }

    /// Elevation check. `Some` ends the run before any provider is touched.
    pub fn preflight(
        &self,
        privilege: &dyn PrivilegeChecker,
    ) -> Result<Option<WorkflowOutcome>, WinupdError> {
        if !privilege.is_elevated()? {
            self.log.warn(
                "Not running elevated; administrator rights are required to install updates",
            );
            return Ok(Some(WorkflowOutcome::NotElevated));
        }
        Ok(None)
    }

    /// Provider stages, assuming preflight passed
    pub fn execute(
        &self,
        provider: &mut dyn UpdateProvider,
        prompt: &mut dyn EulaPrompt,
    ) -> WorkflowOutcome {
        self.log.info(&format!("Searching for updates (filter: {})", self.filter));
        let found = match provider.search(&self.filter) {
            Ok(found) => found,
            Err(e) => return self.provider_failed(Stage::Search, e),
        };

        if found.is_empty() {
            self.log.info("No applicable updates found");
            return WorkflowOutcome::NoApplicableUpdates;
        }
        self.log.info(&format!("Found {} applicable updates", found.len()));

        let Selection {
            mut selected,
            skipped,
        } = match self.select(&found, provider, prompt) {
            Ok(selection) => selection,
            Err(e) => return self.provider_failed(Stage::Eula, e),
        };

        if selected.is_empty() {
            self.log.info("All updates skipped; nothing to download");
            return WorkflowOutcome::AllSkipped { skipped };
        }

        self.log.info(&format!("Downloading {} updates", selected.len()));
        if let Err(e) = provider.download(&mut selected) {
            return self.provider_failed(Stage::Download, e);
        }

        let mut install_set = InstallSet::from_selection(&selected);
        for item in selected.iter().filter(|item| !item.downloaded) {
            self.log.warn(&format!("'{}' was not downloaded", item.title));
        }
        if install_set.is_empty() {
            self.log.warn("No updates were downloaded; skipping installation");
            return WorkflowOutcome::NothingDownloaded {
                selected: selected.len(),
            };
        }
        if install_set.reboot_may_be_required {
            self.log.info("One or more updates may require a reboot");
        }

        self.log.info(&format!("Installing {} updates", install_set.len()));
        let result = match provider.install(&install_set.items) {
            Ok(result) => result,
            Err(e) => return self.provider_failed(Stage::Install, e),
        };

        if result.item_results.len() != install_set.len() {
            self.log.warn(&format!(
                "Engine returned {} results for {} updates",
                result.item_results.len(),
                install_set.len()
            ));
        }

        let mut items = Vec::with_capacity(install_set.len());
        for (i, item) in install_set.items.iter_mut().enumerate() {
            let code = result
                .item_results
                .get(i)
                .copied()
                .unwrap_or(ResultCode::NotStarted);
            item.install_result = Some(code);
            let line = format!("{}: {}", item.title, code);
            if code.is_success() {
                self.log.info(&line);
            } else {
                self.log.warn(&line);
            }
            items.push(ItemReport {
                id: item.id.clone(),
                title: item.title.clone(),
                result: code,
            });
        }

        self.log.info(&format!(
            "Installation finished: {}; reboot required: {}",
            result.result_code,
            if result.reboot_required { "yes" } else { "no" }
        ));

        WorkflowOutcome::Completed(InstallSummary {
            result_code: result.result_code,
            reboot_required: result.reboot_required,
            reboot_may_be_required: install_set.reboot_may_be_required,
            items,
            skipped,
        })
    }

    /// Apply the selection policy to `found`, in order
    pub fn select(
        &self,
        found: &UpdateSearchResult,
        provider: &mut dyn UpdateProvider,
        prompt: &mut dyn EulaPrompt,
    ) -> Result<Selection, ProviderError> {
        let mut selection = Selection::default();

        for item in found.items() {
            if item.requires_user_input {
                self.skip(&mut selection, item, SkipReason::RequiresUserInput);
                continue;
            }

            if item.eula_accepted {
                selection.selected.push(item.clone());
                continue;
            }

            if !prompt.confirm(&item.title, item.eula_text.as_deref()) {
                self.skip(&mut selection, item, SkipReason::EulaDeclined);
                continue;
            }

            provider.accept_eula(item)?;
            let how = if prompt.is_automatic() {
                "automatically"
            } else {
                "by user"
            };
            self.log.info(&format!("License accepted {} for '{}'", how, item.title));
            let mut accepted = item.clone();
            accepted.eula_accepted = true;
            selection.selected.push(accepted);
        }

        Ok(selection)
    }

    fn skip(&self, selection: &mut Selection, item: &UpdateItem, reason: SkipReason) {
        self.log.warn(&format!("Skipping '{}': {}", item.title, reason.as_str()));
        selection.skipped.push(SkippedUpdate {
            id: item.id.clone(),
            title: item.title.clone(),
            reason,
        });
    }

    /// Log a provider failure at ERROR and turn it into the run outcome
    pub fn provider_failed(&self, stage: Stage, e: ProviderError) -> WorkflowOutcome {
        let message = e.to_string();
        self.log.error(&format!("Provider error during {}: {}", stage, message));
        WorkflowOutcome::ProviderFailed { stage, message }
    }
}
