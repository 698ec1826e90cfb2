//! Workflow scenarios against a counting provider
//!
//! Covers the selection policy, stage ordering and early exits:
//! - not elevated stops before search
//! - empty search stops before download/install
//! - every update skipped stops before download
//! - EULA answers decide inclusion and are pushed to the engine
//! - install set keeps search order and drops undownloaded updates
//! - provider failures become ProviderFailed with an ERROR log line

use std::collections::VecDeque;

use tempfile::TempDir;
use winupd_common::run_log::read_entries;
use winupd_common::workflow::SkipReason;
use winupd_common::{
    EulaPrompt, InstallationResult, LogLevel, ProviderError, RebootBehavior, ResultCode, RunLog,
    Stage, StaticPrivilege, UpdateItem, UpdateProvider, UpdateSearchResult, UpdateWorkflow,
    WorkflowOutcome,
};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct MockProvider {
    updates: Vec<UpdateItem>,
    undownloadable: Vec<String>,
    fail_stage: Option<Stage>,
    search_calls: usize,
    download_calls: usize,
    install_calls: usize,
    accepted: Vec<String>,
    downloaded_batch: Vec<String>,
    installed_batch: Vec<String>,
}

impl MockProvider {
    fn with(updates: Vec<UpdateItem>) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    fn fail(&self, stage: Stage) -> Result<(), ProviderError> {
        if self.fail_stage == Some(stage) {
            return Err(ProviderError::operation(stage, "0x80240022"));
        }
        Ok(())
    }
}

impl UpdateProvider for MockProvider {
    fn search(&mut self, _filter: &str) -> Result<UpdateSearchResult, ProviderError> {
        self.search_calls += 1;
        self.fail(Stage::Search)?;
        Ok(UpdateSearchResult::new(self.updates.clone()))
    }

    fn accept_eula(&mut self, item: &UpdateItem) -> Result<(), ProviderError> {
        self.fail(Stage::Eula)?;
        self.accepted.push(item.id.clone());
        Ok(())
    }

    fn download(&mut self, items: &mut [UpdateItem]) -> Result<(), ProviderError> {
        self.download_calls += 1;
        self.fail(Stage::Download)?;
        for item in items.iter_mut() {
            self.downloaded_batch.push(item.id.clone());
            item.downloaded = !self.undownloadable.contains(&item.id);
        }
        Ok(())
    }

    fn install(&mut self, items: &[UpdateItem]) -> Result<InstallationResult, ProviderError> {
        self.install_calls += 1;
        self.fail(Stage::Install)?;
        self.installed_batch = items.iter().map(|i| i.id.clone()).collect();
        Ok(InstallationResult {
            result_code: ResultCode::Succeeded,
            reboot_required: false,
            item_results: vec![ResultCode::Succeeded; items.len()],
        })
    }
}

/// Replays canned console answers
struct ScriptedPrompt {
    answers: VecDeque<&'static str>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    fn new(answers: &[&'static str]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl EulaPrompt for ScriptedPrompt {
    fn confirm(&mut self, title: &str, _eula_text: Option<&str>) -> bool {
        self.asked.push(title.to_string());
        let answer = self.answers.pop_front().unwrap_or("");
        winupd_common::eula::is_acceptance(answer)
    }
}

fn update(id: &str) -> UpdateItem {
    UpdateItem::new(id, format!("Update {}", id))
}

fn needs_input(id: &str) -> UpdateItem {
    UpdateItem {
        requires_user_input: true,
        ..update(id)
    }
}

fn needs_eula(id: &str) -> UpdateItem {
    UpdateItem {
        eula_accepted: false,
        eula_text: Some("License terms".to_string()),
        ..update(id)
    }
}

struct Harness {
    _dir: TempDir,
    log: RunLog,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("logs").join("run.log"), false);
        Self { _dir: dir, log }
    }

    fn run(
        &self,
        elevated: bool,
        provider: &mut MockProvider,
        prompt: &mut dyn EulaPrompt,
    ) -> WorkflowOutcome {
        UpdateWorkflow::new(&self.log, "IsInstalled=0 and Type='Software' and IsHidden=0")
            .run(&StaticPrivilege(elevated), provider, prompt)
            .unwrap()
    }

    fn messages(&self) -> Vec<(LogLevel, String)> {
        read_entries(self.log.path())
            .unwrap_or_default()
            .into_iter()
            .map(|e| (e.level, e.message))
            .collect()
    }

    fn logged(&self, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(_, m)| m.to_lowercase().contains(&needle.to_lowercase()))
    }
}

// ============================================================================
// Early exits
// ============================================================================

#[test]
fn test_not_elevated_never_searches() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![update("a")]);

    let outcome = h.run(false, &mut provider, &mut ScriptedPrompt::new(&[]));

    assert_eq!(outcome, WorkflowOutcome::NotElevated);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(provider.search_calls, 0);
    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, LogLevel::Warn);
}

#[test]
fn test_empty_search_stops_before_download() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![]);

    let outcome = h.run(true, &mut provider, &mut ScriptedPrompt::new(&[]));

    assert_eq!(outcome, WorkflowOutcome::NoApplicableUpdates);
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(provider.search_calls, 1);
    assert_eq!(provider.download_calls, 0);
    assert_eq!(provider.install_calls, 0);
    assert!(h.logged("no applicable updates"));
}

#[test]
fn test_all_requiring_input_are_skipped() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![needs_input("a"), needs_input("b")]);
    let mut prompt = ScriptedPrompt::new(&["y", "y"]);

    let outcome = h.run(true, &mut provider, &mut prompt);

    let WorkflowOutcome::AllSkipped { skipped } = &outcome else {
        panic!("expected AllSkipped, got {:?}", outcome);
    };
    assert_eq!(skipped.len(), 2);
    assert!(skipped
        .iter()
        .all(|s| s.reason == SkipReason::RequiresUserInput));
    assert!(prompt.asked.is_empty());
    assert_eq!(provider.download_calls, 0);
    assert_eq!(provider.install_calls, 0);
    assert!(h.logged("all updates skipped"));
}

#[test]
fn test_declined_eulas_leave_nothing_to_do() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![needs_eula("a"), needs_eula("b")]);

    let outcome = h.run(true, &mut provider, &mut ScriptedPrompt::new(&["n", "N"]));

    assert!(matches!(outcome, WorkflowOutcome::AllSkipped { .. }));
    assert!(provider.accepted.is_empty());
    assert_eq!(provider.download_calls, 0);
}

#[test]
fn test_nothing_downloaded_skips_install() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![update("a"), update("b")]);
    provider.undownloadable = vec!["a".to_string(), "b".to_string()];

    let outcome = h.run(true, &mut provider, &mut ScriptedPrompt::new(&[]));

    assert_eq!(outcome, WorkflowOutcome::NothingDownloaded { selected: 2 });
    assert_eq!(outcome.exit_code(), 4);
    assert_eq!(provider.download_calls, 1);
    assert_eq!(provider.install_calls, 0);
    assert!(h
        .messages()
        .iter()
        .any(|(level, m)| *level == LogLevel::Warn && m.contains("skipping installation")));
}

// ============================================================================
// Selection policy
// ============================================================================

#[test]
fn test_three_item_scenario_selects_last_two_in_order() {
    let h = Harness::new();
    let mut provider =
        MockProvider::with(vec![needs_input("input"), needs_eula("eula"), update("ready")]);
    let mut prompt = ScriptedPrompt::new(&["y"]);

    let outcome = h.run(true, &mut provider, &mut prompt);

    assert!(matches!(outcome, WorkflowOutcome::Completed(_)));
    assert_eq!(provider.downloaded_batch, vec!["eula", "ready"]);
    assert_eq!(provider.accepted, vec!["eula"]);
    assert_eq!(prompt.asked, vec!["Update eula"]);
}

#[test]
fn test_eula_answers_decide_inclusion() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![
        needs_eula("a"),
        needs_eula("b"),
        needs_eula("c"),
        needs_eula("d"),
    ]);
    let mut prompt = ScriptedPrompt::new(&["Y", "n", "yes", "y"]);

    let outcome = h.run(true, &mut provider, &mut prompt);

    let WorkflowOutcome::Completed(summary) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(provider.accepted, vec!["a", "d"]);
    assert_eq!(provider.downloaded_batch, vec!["a", "d"]);
    let skipped: Vec<&str> = summary.skipped.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(skipped, vec!["b", "c"]);
    assert!(summary
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::EulaDeclined));
}

#[test]
fn test_accepted_item_is_marked_going_forward() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![needs_eula("a")]);
    let workflow = UpdateWorkflow::new(&h.log, "IsInstalled=0");

    let found = provider.search("IsInstalled=0").unwrap();
    let selection = workflow
        .select(&found, &mut provider, &mut ScriptedPrompt::new(&["y"]))
        .unwrap();

    assert_eq!(selection.selected.len(), 1);
    assert!(selection.selected[0].eula_accepted);
    assert!(!found.items()[0].eula_accepted, "search result must stay untouched");
}

// ============================================================================
// Install set and reporting
// ============================================================================

#[test]
fn test_install_set_preserves_order_and_drops_undownloaded() {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![update("a"), update("b"), update("c"), update("d")]);
    provider.undownloadable = vec!["b".to_string()];

    let outcome = h.run(true, &mut provider, &mut ScriptedPrompt::new(&[]));

    let WorkflowOutcome::Completed(summary) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(provider.installed_batch, vec!["a", "c", "d"]);
    let reported: Vec<&str> = summary.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(reported, vec!["a", "c", "d"]);
    assert!(h.logged("'Update b' was not downloaded"));
}

#[test]
fn test_reboot_may_be_required_tracks_install_set() {
    let h = Harness::new();
    let rebooting = UpdateItem {
        reboot_behavior: RebootBehavior::CanRequestReboot,
        ..update("r")
    };
    let mut provider = MockProvider::with(vec![update("a"), rebooting]);

    let WorkflowOutcome::Completed(summary) =
        h.run(true, &mut provider, &mut ScriptedPrompt::new(&[]))
    else {
        panic!("expected completion");
    };
    assert!(summary.reboot_may_be_required);
    assert!(h.logged("may require a reboot"));

    let h = Harness::new();
    let mut provider = MockProvider::with(vec![update("a")]);
    let WorkflowOutcome::Completed(summary) =
        h.run(true, &mut provider, &mut ScriptedPrompt::new(&[]))
    else {
        panic!("expected completion");
    };
    assert!(!summary.reboot_may_be_required);
}

// ============================================================================
// Provider failures
// ============================================================================

fn failing_at(stage: Stage) -> (Harness, MockProvider, WorkflowOutcome) {
    let h = Harness::new();
    let mut provider = MockProvider::with(vec![needs_eula("a"), update("b")]);
    provider.fail_stage = Some(stage);
    let outcome = h.run(true, &mut provider, &mut ScriptedPrompt::new(&["y"]));
    (h, provider, outcome)
}

#[test]
fn test_search_failure_is_reported() {
    let (h, provider, outcome) = failing_at(Stage::Search);

    assert!(matches!(
        outcome,
        WorkflowOutcome::ProviderFailed { stage: Stage::Search, .. }
    ));
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(provider.download_calls, 0);
    assert!(h
        .messages()
        .iter()
        .any(|(level, m)| *level == LogLevel::Error && m.contains("0x80240022")));
}

#[test]
fn test_eula_failure_stops_before_download() {
    let (_h, provider, outcome) = failing_at(Stage::Eula);

    assert!(matches!(
        outcome,
        WorkflowOutcome::ProviderFailed { stage: Stage::Eula, .. }
    ));
    assert_eq!(provider.download_calls, 0);
}

#[test]
fn test_download_failure_stops_before_install() {
    let (_h, provider, outcome) = failing_at(Stage::Download);

    assert!(matches!(
        outcome,
        WorkflowOutcome::ProviderFailed { stage: Stage::Download, .. }
    ));
    assert_eq!(provider.install_calls, 0);
}

#[test]
fn test_install_failure_is_reported() {
    let (h, provider, outcome) = failing_at(Stage::Install);

    assert!(matches!(
        outcome,
        WorkflowOutcome::ProviderFailed { stage: Stage::Install, .. }
    ));
    assert_eq!(provider.install_calls, 1);
    assert!(h.logged("provider error during install"));
}
