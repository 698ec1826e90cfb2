//! JSON-backed provider
//!
//! Replays a described set of updates, including engine failures, without
//! touching the system:
//!
//! ```json
//! {
//!   "updates": [
//!     { "id": "KB5031356", "title": "2026-10 Cumulative Update",
//!       "reboot_behavior": "always_requires_reboot" },
//!     { "id": "drv-1", "title": "Vendor driver", "eula_accepted": false,
//!       "eula_text": "...", "install_outcome": "failed" }
//!   ],
//!   "download_error": null
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::UpdateProvider;
use crate::error::{ProviderError, Stage};
use crate::update_types::{
    InstallationResult, RebootBehavior, ResultCode, UpdateItem, UpdateSearchResult,
};

/// One update plus the outcomes the fixture should simulate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureUpdate {
    #[serde(flatten)]
    pub item: UpdateItem,
    /// Leave the update undownloaded after a successful batch
    #[serde(default)]
    pub download_fails: bool,
    #[serde(default = "default_install_outcome")]
    pub install_outcome: ResultCode,
}

fn default_install_outcome() -> ResultCode {
    ResultCode::Succeeded
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub updates: Vec<FixtureUpdate>,
    /// Fail the whole search call with this message
    #[serde(default)]
    pub search_error: Option<String>,
    #[serde(default)]
    pub download_error: Option<String>,
    #[serde(default)]
    pub install_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FixtureProvider {
    fixture: FixtureFile,
}

impl FixtureProvider {
    pub fn new(fixture: FixtureFile) -> Self {
        Self { fixture }
    }

    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, ProviderError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProviderError::Fixture(format!("cannot read {}: {}", path.display(), e))
        })?;
        let provider = Self::from_json(&content)?;
        debug!(
            "Loaded fixture {} with {} updates",
            path.display(),
            provider.fixture.updates.len()
        );
        Ok(provider)
    }

    /// Engine-side view of an update
    pub fn update(&self, id: &str) -> Option<&UpdateItem> {
        self.fixture
            .updates
            .iter()
            .find(|u| u.item.id == id)
            .map(|u| &u.item)
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut FixtureUpdate, ProviderError> {
        self.fixture
            .updates
            .iter_mut()
            .find(|u| u.item.id == id)
            .ok_or_else(|| ProviderError::UnknownUpdate(id.to_string()))
    }
}

impl UpdateProvider for FixtureProvider {
    fn search(&mut self, filter: &str) -> Result<UpdateSearchResult, ProviderError> {
        debug!("Fixture search with filter: {}", filter);
        if let Some(message) = &self.fixture.search_error {
            return Err(ProviderError::operation(Stage::Search, message.clone()));
        }

        let items = self
            .fixture
            .updates
            .iter()
            .map(|u| u.item.clone())
            .collect();
        Ok(UpdateSearchResult::new(items))
    }

    fn accept_eula(&mut self, item: &UpdateItem) -> Result<(), ProviderError> {
        self.entry_mut(&item.id)?.item.eula_accepted = true;
        Ok(())
    }

    fn download(&mut self, items: &mut [UpdateItem]) -> Result<(), ProviderError> {
        if let Some(message) = &self.fixture.download_error {
            return Err(ProviderError::operation(Stage::Download, message.clone()));
        }

        for item in items.iter_mut() {
            let entry = self.entry_mut(&item.id)?;
            if !entry.download_fails {
                entry.item.downloaded = true;
            }
            item.downloaded = entry.item.downloaded;
        }
        Ok(())
    }

    fn install(&mut self, items: &[UpdateItem]) -> Result<InstallationResult, ProviderError> {
        if let Some(message) = &self.fixture.install_error {
            return Err(ProviderError::operation(Stage::Install, message.clone()));
        }

        let mut item_results = Vec::with_capacity(items.len());
        let mut reboot_required = false;
        for item in items {
            let entry = self.entry_mut(&item.id)?;
            let outcome = if entry.item.downloaded {
                entry.install_outcome
            } else {
                ResultCode::Failed
            };
            entry.item.install_result = Some(outcome);
            if outcome.is_success()
                && entry.item.reboot_behavior == RebootBehavior::AlwaysRequiresReboot
            {
                reboot_required = true;
            }
            item_results.push(outcome);
        }

        Ok(InstallationResult {
            result_code: aggregate(&item_results),
            reboot_required,
            item_results,
        })
    }
}

/// Overall code the way the engine reports a batch
fn aggregate(results: &[ResultCode]) -> ResultCode {
    if results.is_empty() {
        return ResultCode::NotStarted;
    }
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    if succeeded == results.len() {
        if results.iter().all(|r| *r == ResultCode::Succeeded) {
            ResultCode::Succeeded
        } else {
            ResultCode::SucceededWithErrors
        }
    } else if succeeded > 0 {
        ResultCode::SucceededWithErrors
    } else {
        ResultCode::Failed
    }
}
