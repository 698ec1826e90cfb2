//! Elevation check
//!
//! Installing system updates needs an administrator token on Windows and
//! root elsewhere.

use crate::error::WinupdError;

pub trait PrivilegeChecker {
    /// Whether the current process runs elevated. An `Err` means the OS
    /// could not be asked, which callers treat as fatal.
    fn is_elevated(&self) -> Result<bool, WinupdError>;
}

/// Queries the running process
#[derive(Debug, Default, Clone, Copy)]
pub struct OsPrivilegeChecker;

impl PrivilegeChecker for OsPrivilegeChecker {
    fn is_elevated(&self) -> Result<bool, WinupdError> {
        #[cfg(windows)]
        {
            windows_token::is_elevated()
        }
        #[cfg(unix)]
        {
            Ok(unsafe { libc::geteuid() } == 0)
        }
        #[cfg(not(any(windows, unix)))]
        {
            Err(WinupdError::PrivilegeQuery(
                "unsupported platform".to_string(),
            ))
        }
    }
}

/// Fixed answer, for rehearsals and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticPrivilege(pub bool);

impl PrivilegeChecker for StaticPrivilege {
    fn is_elevated(&self) -> Result<bool, WinupdError> {
        Ok(self.0)
    }
}

#[cfg(windows)]
mod windows_token {
    use crate::error::WinupdError;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    pub fn is_elevated() -> Result<bool, WinupdError> {
        unsafe {
            let mut token = HANDLE::default();
            OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token)
                .map_err(|e| WinupdError::PrivilegeQuery(e.to_string()))?;

            let mut elevation = TOKEN_ELEVATION::default();
            let mut return_length = 0u32;
            let result = GetTokenInformation(
                token,
                TokenElevation,
                Some(&mut elevation as *mut _ as *mut _),
                std::mem::size_of::<TOKEN_ELEVATION>() as u32,
                &mut return_length,
            );

            let _ = CloseHandle(token);
            result.map_err(|e| WinupdError::PrivilegeQuery(e.to_string()))?;
            Ok(elevation.TokenIsElevated != 0)
        }
    }
}
