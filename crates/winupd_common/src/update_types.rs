//! Update data model
//!
//! Items flow search -> selection -> install set. Every later set is an
//! order-preserving filter of the previous one, matched by `id`.

use serde::{Deserialize, Serialize};

/// Reboot behavior advertised by an update, ordered by severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RebootBehavior {
    #[default]
    NeverReboots,
    CanRequestReboot,
    AlwaysRequiresReboot,
}

impl RebootBehavior {
    /// Map the engine's ordinal (0 = never, 1 = always, 2 = can request)
    pub fn from_engine_ordinal(value: i32) -> Self {
        match value {
            1 => RebootBehavior::AlwaysRequiresReboot,
            2 => RebootBehavior::CanRequestReboot,
            _ => RebootBehavior::NeverReboots,
        }
    }

    pub fn may_reboot(&self) -> bool {
        *self > RebootBehavior::NeverReboots
    }
}

/// Outcome of an engine operation, same ordinals as the OS result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    #[default]
    NotStarted,
    InProgress,
    Succeeded,
    SucceededWithErrors,
    Failed,
    Aborted,
}

impl ResultCode {
    pub fn from_ordinal(value: i32) -> Self {
        match value {
            1 => ResultCode::InProgress,
            2 => ResultCode::Succeeded,
            3 => ResultCode::SucceededWithErrors,
            4 => ResultCode::Failed,
            5 => ResultCode::Aborted,
            _ => ResultCode::NotStarted,
        }
    }

    pub fn ordinal(&self) -> i32 {
        match self {
            ResultCode::NotStarted => 0,
            ResultCode::InProgress => 1,
            ResultCode::Succeeded => 2,
            ResultCode::SucceededWithErrors => 3,
            ResultCode::Failed => 4,
            ResultCode::Aborted => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::NotStarted => "not started",
            ResultCode::InProgress => "in progress",
            ResultCode::Succeeded => "succeeded",
            ResultCode::SucceededWithErrors => "succeeded with errors",
            ResultCode::Failed => "failed",
            ResultCode::Aborted => "aborted",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Succeeded | ResultCode::SucceededWithErrors)
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate update as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    /// Provider-side identity
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub requires_user_input: bool,
    #[serde(default = "default_true")]
    pub eula_accepted: bool,
    #[serde(default)]
    pub eula_text: Option<String>,
    /// Set by the provider's download stage
    #[serde(default)]
    pub downloaded: bool,
    /// Set after install
    #[serde(default)]
    pub install_result: Option<ResultCode>,
    #[serde(default)]
    pub reboot_behavior: RebootBehavior,
}

fn default_true() -> bool {
    true
}

impl UpdateItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            requires_user_input: false,
            eula_accepted: true,
            eula_text: None,
            downloaded: false,
            install_result: None,
            reboot_behavior: RebootBehavior::NeverReboots,
        }
    }
}

/// Result of one search, in provider order. Not mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSearchResult {
    items: Vec<UpdateItem>,
}

impl UpdateSearchResult {
    pub fn new(items: Vec<UpdateItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[UpdateItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Updates accepted for download
pub type SelectionSet = Vec<UpdateItem>;

/// Downloaded members of the selection, handed to install
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSet {
    pub items: Vec<UpdateItem>,
    /// True if any member may trigger a reboot
    pub reboot_may_be_required: bool,
}

impl InstallSet {
    /// Keep downloaded items of `selection`, in order
    pub fn from_selection(selection: &[UpdateItem]) -> Self {
        let mut items = Vec::new();
        let mut reboot_may_be_required = false;
        for item in selection.iter().filter(|item| item.downloaded) {
            reboot_may_be_required |= item.reboot_behavior.may_reboot();
            items.push(item.clone());
        }
        Self {
            items,
            reboot_may_be_required,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Aggregate install outcome. `item_results[i]` belongs to `InstallSet.items[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationResult {
    pub result_code: ResultCode,
    pub reboot_required: bool,
    pub item_results: Vec<ResultCode>,
}
