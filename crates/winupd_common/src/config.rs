//! Configuration management for winupd.
//!
//! Loads settings from TOML. Lookup order: explicit path, `$WINUPD_CONFIG`,
//! `<config dir>/winupd/config.toml`, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::eula::EulaPolicy;
use crate::provider::{ProviderKind, DEFAULT_SEARCH_FILTER};

/// Environment override for the config file location
pub const CONFIG_ENV: &str = "WINUPD_CONFIG";

/// Default environment variable holding the SMTP password
pub const DEFAULT_PASSWORD_ENV: &str = "WINUPD_SMTP_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Engine search predicate, passed through verbatim
    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default)]
    pub provider: ProviderKind,

    /// JSON file for the fixture provider
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

fn default_filter() -> String {
    DEFAULT_SEARCH_FILTER.to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            provider: ProviderKind::default(),
            fixture: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EulaConfig {
    #[serde(default)]
    pub policy: EulaPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Refuse to write into an existing log file
    #[serde(default)]
    pub no_clobber: bool,
}

/// `<local data dir>/winupd/logs`, or `./logs` if the platform has none
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("winupd").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            no_clobber: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default = "default_true")]
    pub starttls: bool,

    #[serde(default)]
    pub username: Option<String>,

    /// Name of the environment variable holding the password
    #[serde(default = "default_password_env")]
    pub password_env: String,

    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub to: Vec<String>,

    /// Mail when a provider stage fails
    #[serde(default = "default_true")]
    pub on_failure: bool,

    /// Mail after a completed install
    #[serde(default)]
    pub on_completion: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            starttls: true,
            username: None,
            password_env: default_password_env(),
            from: None,
            to: Vec::new(),
            on_failure: true,
            on_completion: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub eula: EulaConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Resolve and load the config. A named file that fails to load is an
    /// error; an absent default location yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from_path(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Config::default())
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Cross-field checks that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("search.filter is empty".to_string()));
        }
        if cfg!(not(windows)) && self.search.provider == ProviderKind::Wua {
            return Err(ConfigError::Invalid(
                "search.provider = \"wua\" is only available on Windows".to_string(),
            ));
        }
        if self.search.provider == ProviderKind::Fixture && self.search.fixture.is_none() {
            return Err(ConfigError::Invalid(
                "search.provider = \"fixture\" needs search.fixture".to_string(),
            ));
        }
        if self.notify.enabled && self.notify.smtp_host.is_none() {
            return Err(ConfigError::Invalid(
                "notify.enabled needs notify.smtp_host".to_string(),
            ));
        }
        Ok(())
    }
}

/// `<config dir>/winupd/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("winupd").join("config.toml"))
}
