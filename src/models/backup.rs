//! Backup listing and restore payloads.

use serde::{Deserialize, Serialize};

/// One entry of the rotating backup index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupInfo {
    pub key: String,
    /// Epoch milliseconds embedded in the key
    pub timestamp: i64,
}

/// Request body for `POST /api/backups/restore`.
#[derive(Debug, Clone, Deserialize)]
pub struct RestoreBackupRequest {
    #[serde(default)]
    pub key: String,
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub retained: usize,
    pub evicted: Vec<String>,
}
