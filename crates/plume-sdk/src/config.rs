use std::path::Path;

use plume_drafts::AutosaveConfig;
use plume_relay::RelayConfig;
use plume_types::PublicKey;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Scheduler service settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Key of the service that publishes scheduled posts. Scheduling is
    /// unavailable without it.
    pub service_pubkey: Option<PublicKey>,
}

/// Top-level Plume configuration, usually read from a TOML file:
///
/// ```toml
/// [autosave]
/// change_threshold = 2
/// fallback_interval_secs = 30
///
/// [relay]
/// urls = ["wss://relay.example.com"]
///
/// [schedule]
/// service_pubkey = "<hex>"
/// ```
///
/// Every section and field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlumeConfig {
    pub autosave: AutosaveConfig,
    pub relay: RelayConfig,
    pub schedule: ScheduleConfig,
}

impl PlumeConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }
}
