use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{CourtsideError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Data file for the json backend.
    pub path: Option<String>,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Auto-dismiss delay for a pending metric selection.
    pub pending_timeout_ms: u64,
    /// Roster slots reachable with the digit keys; the rest use the cursor.
    pub shortcut_slots: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtsideConfig {
    pub store: StoreConfig,
    pub recorder: RecorderConfig,
    pub ops: OpsConfig,
}

impl CourtsideConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            CourtsideError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            CourtsideError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.channel_capacity == 0 {
            return Err(CourtsideError::Configuration(
                "store.channel_capacity must be greater than zero".into(),
            ));
        }
        if self.store.backend == StoreBackend::Json
            && self.store.path.as_deref().map_or(true, str::is_empty)
        {
            return Err(CourtsideError::Configuration(
                "store.path is required for the json backend".into(),
            ));
        }
        if self.recorder.pending_timeout_ms == 0 {
            return Err(CourtsideError::Configuration(
                "recorder.pending_timeout_ms must be greater than zero".into(),
            ));
        }
        if !(1..=9).contains(&self.recorder.shortcut_slots) {
            return Err(CourtsideError::Configuration(
                "recorder.shortcut_slots must be between 1 and 9".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CourtsideConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                path: None,
                channel_capacity: 64,
            },
            recorder: RecorderConfig {
                pending_timeout_ms: 3_000,
                shortcut_slots: 9,
            },
            ops: OpsConfig {
                log_level: "info".into(),
                data_dir: "data".into(),
            },
        }
    }
}
