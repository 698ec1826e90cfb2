//! Error types for winupd.

use thiserror::Error;

/// Stage of the update pipeline a provider call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Search,
    Eula,
    Download,
    Install,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Search => "search",
            Stage::Eula => "eula",
            Stage::Download => "download",
            Stage::Install => "install",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by an update provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("update engine unavailable: {0}")]
    Unavailable(String),

    #[error("{stage} failed: {message}")]
    Operation { stage: Stage, message: String },

    #[error("unknown update '{0}'")]
    UnknownUpdate(String),

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn operation(stage: Stage, message: impl Into<String>) -> Self {
        ProviderError::Operation {
            stage,
            message: message.into(),
        }
    }
}

/// Run log failures. Never escape [`crate::run_log::RunLog::log`].
#[derive(Error, Debug)]
pub enum RunLogError {
    #[error("log file {0} already exists and no-clobber is set")]
    Clobber(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notifications are not configured: {0}")]
    NotConfigured(String),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("cannot build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum WinupdError {
    #[error("privilege query failed: {0}")]
    PrivilegeQuery(String),
}
