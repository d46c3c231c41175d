use crate::error::ConfigError;
use crate::trust::TrustLevel;
use tracing::Level;

pub const DEFAULT_SID: &str = "S1";
pub const DEFAULT_OUTBOUND_QUEUE_CAP: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Session id stamped on every envelope; inbound envelopes must match.
    pub sid: String,
    pub outbound_queue_cap: usize,
    /// Level assumed until the host sends a `trust` envelope.
    pub trust_level: TrustLevel,
    pub log_level: Level,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            sid: DEFAULT_SID.to_string(),
            outbound_queue_cap: DEFAULT_OUTBOUND_QUEUE_CAP,
            trust_level: TrustLevel::Guest,
            log_level: Level::INFO,
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. A queue capacity that is not a
    /// positive integer falls back to the default; unknown trust or log
    /// levels are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let sid = lookup("SDUI_SID")
            .filter(|sid| !sid.trim().is_empty())
            .unwrap_or(defaults.sid);

        let outbound_queue_cap = lookup("SDUI_OUTBOUND_QUEUE_CAP")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.outbound_queue_cap);

        let trust_level = match lookup("SDUI_TRUST_LEVEL") {
            Some(raw) => raw.parse::<TrustLevel>()?,
            None => defaults.trust_level,
        };

        let log_level = match lookup("SDUI_LOG_LEVEL") {
            Some(raw) => raw
                .trim()
                .parse::<Level>()
                .map_err(|err| ConfigError::LogLevel {
                    value: raw.clone(),
                    reason: err.to_string(),
                })?,
            None => defaults.log_level,
        };

        Ok(Self {
            sid,
            outbound_queue_cap,
            trust_level,
            log_level,
        })
    }
}
