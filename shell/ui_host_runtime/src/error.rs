use crate::trust::UnknownTrustLevel;
use std::io;

/// Why a fetched screen could not be turned into a session.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("fetch result carried no data")]
    MissingData,

    #[error("invalid descriptor payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("mini-app defines no pages")]
    NoPages,

    #[error("entry page '{0}' is not defined by this mini-app")]
    UnknownEntryPage(String),
}

impl LoadError {
    /// Code carried by the `error` envelope reported to the host.
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::FetchFailed(_) | LoadError::MissingData => "fetch_failed",
            LoadError::Decode(_) | LoadError::NoPages | LoadError::UnknownEntryPage(_) => {
                "invalid_descriptor"
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SDUI_TRUST_LEVEL: {0}")]
    TrustLevel(#[from] UnknownTrustLevel),

    #[error("SDUI_LOG_LEVEL: invalid level '{value}': {reason}")]
    LogLevel { value: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid RUST_LOG: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::FromEnvError),

    #[error("failed to install log subscriber: {0}")]
    LogInit(#[from] tracing_subscriber::util::TryInitError),

    #[error("{0}")]
    Disconnected(&'static str),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
