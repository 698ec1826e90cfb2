//! Windows Update Agent provider
//!
//! Thin COM wrapper over `IUpdateSession`. Search results are kept so later
//! stages can hand the engine its own `IUpdate` objects back.

use tracing::debug;
use windows::core::BSTR;
use windows::Win32::Foundation::{RPC_E_CHANGED_MODE, S_FALSE, S_OK};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_INPROC_SERVER,
    COINIT_APARTMENTTHREADED,
};
use windows::Win32::System::UpdateAgent::{
    IUpdate, IUpdateCollection, IUpdateSession, UpdateCollection, UpdateSession,
};

use super::UpdateProvider;
use crate::error::{ProviderError, Stage};
use crate::update_types::{
    InstallationResult, RebootBehavior, ResultCode, UpdateItem, UpdateSearchResult,
};

/// Balances a successful `CoInitializeEx` on this thread
struct ComApartment {
    did_init: bool,
}

impl ComApartment {
    fn enter() -> Result<Self, ProviderError> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        let did_init = if hr == S_OK || hr == S_FALSE {
            true
        } else if hr == RPC_E_CHANGED_MODE {
            // already initialized with another model; not ours to undo
            false
        } else {
            return Err(ProviderError::Unavailable(format!(
                "COM init failed: 0x{:08X}",
                hr.0 as u32
            )));
        };
        Ok(Self { did_init })
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.did_init {
            unsafe { CoUninitialize() };
        }
    }
}

// Fields drop in order: COM objects are released before the apartment.
pub struct WuaProvider {
    session: IUpdateSession,
    /// Engine objects from the last search, by update id
    found: Vec<(String, IUpdate)>,
    _apartment: ComApartment,
}

impl WuaProvider {
    pub fn connect() -> Result<Self, ProviderError> {
        let apartment = ComApartment::enter()?;
        let session: IUpdateSession =
            unsafe { CoCreateInstance(&UpdateSession, None, CLSCTX_INPROC_SERVER) }
                .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(Self {
            session,
            found: Vec::new(),
            _apartment: apartment,
        })
    }

    fn lookup(&self, id: &str) -> Result<&IUpdate, ProviderError> {
        self.found
            .iter()
            .find(|(found_id, _)| found_id == id)
            .map(|(_, update)| update)
            .ok_or_else(|| ProviderError::UnknownUpdate(id.to_string()))
    }

    fn collection(
        &self,
        stage: Stage,
        items: &[UpdateItem],
    ) -> Result<IUpdateCollection, ProviderError> {
        unsafe {
            let collection: IUpdateCollection =
                CoCreateInstance(&UpdateCollection, None, CLSCTX_INPROC_SERVER)
                    .map_err(|e| com_error(stage, e))?;
            for item in items {
                collection
                    .Add(self.lookup(&item.id)?)
                    .map_err(|e| com_error(stage, e))?;
            }
            Ok(collection)
        }
    }
}

fn com_error(stage: Stage, e: windows::core::Error) -> ProviderError {
    ProviderError::operation(stage, format!("{} (0x{:08X})", e.message(), e.code().0))
}

fn describe(update: &IUpdate) -> windows::core::Result<UpdateItem> {
    unsafe {
        let behavior = update.InstallationBehavior()?;
        let eula_text = update.EulaText()?.to_string();
        Ok(UpdateItem {
            id: update.Identity()?.UpdateID()?.to_string(),
            title: update.Title()?.to_string(),
            requires_user_input: behavior.CanRequestUserInput()?.as_bool(),
            eula_accepted: update.EulaAccepted()?.as_bool(),
            eula_text: (!eula_text.is_empty()).then_some(eula_text),
            downloaded: update.IsDownloaded()?.as_bool(),
            install_result: None,
            reboot_behavior: RebootBehavior::from_engine_ordinal(behavior.RebootBehavior()?.0),
        })
    }
}

impl UpdateProvider for WuaProvider {
    fn search(&mut self, filter: &str) -> Result<UpdateSearchResult, ProviderError> {
        unsafe {
            let searcher = self
                .session
                .CreateUpdateSearcher()
                .map_err(|e| com_error(Stage::Search, e))?;
            let result = searcher
                .Search(&BSTR::from(filter))
                .map_err(|e| com_error(Stage::Search, e))?;
            let updates = result.Updates().map_err(|e| com_error(Stage::Search, e))?;
            let count = updates.Count().map_err(|e| com_error(Stage::Search, e))?;

            self.found.clear();
            let mut items = Vec::with_capacity(count.max(0) as usize);
            for i in 0..count {
                let update = updates
                    .get_Item(i)
                    .map_err(|e| com_error(Stage::Search, e))?;
                let item = describe(&update).map_err(|e| com_error(Stage::Search, e))?;
                debug!("Found {} ({})", item.title, item.id);
                self.found.push((item.id.clone(), update));
                items.push(item);
            }
            Ok(UpdateSearchResult::new(items))
        }
    }

    fn accept_eula(&mut self, item: &UpdateItem) -> Result<(), ProviderError> {
        unsafe {
            self.lookup(&item.id)?
                .AcceptEula()
                .map_err(|e| com_error(Stage::Eula, e))
        }
    }

    fn download(&mut self, items: &mut [UpdateItem]) -> Result<(), ProviderError> {
        let collection = self.collection(Stage::Download, items)?;
        unsafe {
            let downloader = self
                .session
                .CreateUpdateDownloader()
                .map_err(|e| com_error(Stage::Download, e))?;
            downloader
                .SetUpdates(&collection)
                .map_err(|e| com_error(Stage::Download, e))?;
            downloader
                .Download()
                .map_err(|e| com_error(Stage::Download, e))?;

            for item in items.iter_mut() {
                item.downloaded = self
                    .lookup(&item.id)?
                    .IsDownloaded()
                    .map_err(|e| com_error(Stage::Download, e))?
                    .as_bool();
            }
        }
        Ok(())
    }

    fn install(&mut self, items: &[UpdateItem]) -> Result<InstallationResult, ProviderError> {
        let collection = self.collection(Stage::Install, items)?;
        unsafe {
            let installer = self
                .session
                .CreateUpdateInstaller()
                .map_err(|e| com_error(Stage::Install, e))?;
            installer
                .SetUpdates(&collection)
                .map_err(|e| com_error(Stage::Install, e))?;
            let result = installer
                .Install()
                .map_err(|e| com_error(Stage::Install, e))?;

            let mut item_results = Vec::with_capacity(items.len());
            for i in 0..items.len() as i32 {
                let code = result
                    .GetUpdateResult(i)
                    .and_then(|r| r.ResultCode())
                    .map_err(|e| com_error(Stage::Install, e))?;
                item_results.push(ResultCode::from_ordinal(code.0));
            }

            Ok(InstallationResult {
                result_code: ResultCode::from_ordinal(
                    result
                        .ResultCode()
                        .map_err(|e| com_error(Stage::Install, e))?
                        .0,
                ),
                reboot_required: result
                    .RebootRequired()
                    .map_err(|e| com_error(Stage::Install, e))?
                    .as_bool(),
                item_results,
            })
        }
    }
}
