use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Verification tier of the current user, lowest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    #[default]
    Guest,
    Registered,
    Verified,
}

impl TrustLevel {
    pub const ALL: [TrustLevel; 3] = [
        TrustLevel::Guest,
        TrustLevel::Registered,
        TrustLevel::Verified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrustLevel::Guest => "guest",
            TrustLevel::Registered => "registered",
            TrustLevel::Verified => "verified",
        }
    }

    fn from_index(index: u8) -> TrustLevel {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .unwrap_or_default()
    }

    fn index(self) -> u8 {
        match self {
            TrustLevel::Guest => 0,
            TrustLevel::Registered => 1,
            TrustLevel::Verified => 2,
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trust level '{0}'")]
pub struct UnknownTrustLevel(pub String);

impl FromStr for TrustLevel {
    type Err = UnknownTrustLevel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| UnknownTrustLevel(raw.to_string()))
    }
}

/// Read-only view of the session authority that owns the user's trust level.
///
/// Queried once per render pass, so implementations must return the value
/// current at call time.
pub trait TrustLevelSource: Send + Sync {
    fn current(&self) -> TrustLevel;
}

impl TrustLevelSource for TrustLevel {
    fn current(&self) -> TrustLevel {
        *self
    }
}

/// Trust level shared between the host (writer) and the interpreter (reader).
#[derive(Debug, Clone, Default)]
pub struct SharedTrustLevel(Arc<AtomicU8>);

impl SharedTrustLevel {
    pub fn new(level: TrustLevel) -> Self {
        Self(Arc::new(AtomicU8::new(level.index())))
    }

    pub fn set(&self, level: TrustLevel) {
        self.0.store(level.index(), Ordering::Release);
    }
}

impl TrustLevelSource for SharedTrustLevel {
    fn current(&self) -> TrustLevel {
        TrustLevel::from_index(self.0.load(Ordering::Acquire))
    }
}
