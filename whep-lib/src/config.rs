use std::{env, fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigurationError;

const DEFAULT_ICE_SERVER: &str = "stun:stun.l.google.com:19302";

fn default_true() -> bool {
    true
}

fn default_ice_servers() -> Vec<String> {
    vec![DEFAULT_ICE_SERVER.to_owned()]
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct WhepConfig {
    #[serde(default)]
    pub server_address: Option<String>,
    #[serde(default)]
    pub local_peer_id: Option<String>,
    /// Only changes how loudly failures are logged.
    #[serde(default = "default_true")]
    pub auto_log_errors: bool,
    #[serde(default)]
    pub server_presets: Vec<String>,
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for WhepConfig {
    fn default() -> Self {
        Self {
            server_address: None,
            local_peer_id: None,
            auto_log_errors: true,
            server_presets: Vec::new(),
            ice_servers: default_ice_servers(),
            request_timeout_secs: None,
        }
    }
}

impl WhepConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        debug!("loading config from {}", path.display());
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn server_address(&self) -> Result<&str, ConfigurationError> {
        self.server_address
            .as_deref()
            .filter(|x| !x.is_empty())
            .ok_or(ConfigurationError::MissingServerAddress)
    }

    pub fn local_peer_id_or_host(&self) -> String {
        self.local_peer_id
            .clone()
            .filter(|x| !x.is_empty())
            .unwrap_or_else(host_identity)
    }

    pub fn server_preset(&self, index: usize) -> Option<&str> {
        self.server_presets.get(index).map(|x| x.as_str())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Name of this machine, falling back to a random id.
pub fn host_identity() -> String {
    ["COMPUTERNAME", "HOSTNAME"]
        .into_iter()
        .find_map(|key| env::var(key).ok())
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|x| x.trim().to_owned())
        .filter(|x| !x.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
