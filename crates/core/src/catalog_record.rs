//! Durable catalog record types.

use serde::{Deserialize, Serialize};

/// Processing lifecycle of a folder or mission manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Running => "running",
            ProcessingStatus::Complete => "complete",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingStatus::Pending),
            "running" => Some(ProcessingStatus::Running),
            "complete" => Some(ProcessingStatus::Complete),
            "failed" => Some(ProcessingStatus::Failed),
            _ => None,
        }
    }

    /// Whether a folder/mission in this status needs reprocessing on the next
    /// scan, independent of a fingerprint change.
    pub fn needs_reprocessing(&self) -> bool {
        matches!(self, ProcessingStatus::Pending | ProcessingStatus::Failed)
    }
}

/// One per discovered second-level directory (`mission/subfolder`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub folder_key: String,
    pub mission_key: String,
    pub fingerprint: String,
    pub size_kb: u64,
    pub file_count: u64,
    pub last_checked_epoch: i64,
    pub last_processed_epoch: Option<i64>,
    pub processing_status: ProcessingStatus,
    pub processing_time_s: Option<i64>,
    pub output_path: String,
    pub error_message: Option<String>,
}

/// One per mission with a `*.metacloud` manifest file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionMetacloudRecord {
    pub mission_key: String,
    pub fingerprint: String,
    pub output_path: String,
    pub last_checked_epoch: i64,
    pub last_processed_epoch: Option<i64>,
    pub processing_time_s: Option<i64>,
    pub processing_status: ProcessingStatus,
    pub error_message: Option<String>,
}

/// `<mission_key>/<subfolder>` join used as `FolderRecord::folder_key`.
pub fn folder_key(mission_key: &str, subfolder: &str) -> String {
    format!("{}/{}", mission_key, subfolder)
}

/// Archive output path: `<zip_root>/<folder_key>.tar.gz`, relative to `zip_root`.
pub fn archive_output_path(folder_key: &str) -> String {
    format!("{}.tar.gz", folder_key)
}
