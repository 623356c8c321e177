//! Runtime configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use qv_ledger::LedgerConfig;

use crate::error::RuntimeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Root directory; each session lives in `<data_dir>/<session_id>/`.
    pub data_dir: PathBuf,
    /// Snapshot every N committed commands. 0 disables snapshots.
    pub snapshot_interval: u64,
    pub ledger: LedgerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("qv-data"),
            snapshot_interval: 0,
            ledger: LedgerConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        serde_json::from_str(json).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Directory holding one session's journal, notifications and snapshots.
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.data_dir.join(session_id)
    }
}
