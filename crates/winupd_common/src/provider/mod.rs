//! Update providers
//!
//! The workflow drives an opaque update engine through this trait. The real
//! engine is the Windows Update Agent; the fixture provider replays a JSON
//! description for rehearsals.

pub mod fixture;
#[cfg(windows)]
pub mod wua;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::update_types::{InstallationResult, UpdateItem, UpdateSearchResult};

pub use fixture::FixtureProvider;
#[cfg(windows)]
pub use wua::WuaProvider;

/// Default search predicate: software updates not yet installed or hidden
pub const DEFAULT_SEARCH_FILTER: &str = "IsInstalled=0 and Type='Software' and IsHidden=0";

/// Search, download and install capability of an update engine
pub trait UpdateProvider {
    /// Run one search. `filter` is passed to the engine verbatim.
    fn search(&mut self, filter: &str) -> Result<UpdateSearchResult, ProviderError>;

    /// Record EULA acceptance on the engine side for `item`
    fn accept_eula(&mut self, item: &UpdateItem) -> Result<(), ProviderError>;

    /// Download all of `items` as one batch, setting `downloaded` in place
    fn download(&mut self, items: &mut [UpdateItem]) -> Result<(), ProviderError>;

    /// Install `items` as one batch. Per-item results follow `items` order.
    fn install(&mut self, items: &[UpdateItem]) -> Result<InstallationResult, ProviderError>;
}

/// Which provider backs a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Windows Update Agent
    #[default]
    Wua,
    /// JSON fixture file
    Fixture,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Wua => "wua",
            ProviderKind::Fixture => "fixture",
        }
    }
}

/// Open the Windows Update Agent for this process
#[cfg(windows)]
pub fn open_system_provider() -> Result<Box<dyn UpdateProvider>, ProviderError> {
    Ok(Box::new(WuaProvider::connect()?))
}

#[cfg(not(windows))]
pub fn open_system_provider() -> Result<Box<dyn UpdateProvider>, ProviderError> {
    Err(ProviderError::Unavailable(
        "the Windows Update Agent only exists on Windows; use the fixture provider".to_string(),
    ))
}
