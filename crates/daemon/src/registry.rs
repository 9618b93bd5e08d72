//! Status Registry: in-memory `job_name -> JobStatus`,
//! append-merge semantics, no field ever cleared by omission.

use lidar_core::{JobPhase, JobStatus, JobStatusPatch};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct StatusRegistry {
    entries: Mutex<HashMap<String, JobStatus>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job_name: &str) -> Option<JobStatus> {
        self.entries.lock().get(job_name).cloned()
    }

    pub fn create(
        &self,
        job_name: &str,
        cli_args: Vec<String>,
        output_path: String,
        format: Option<String>,
        now: i64,
    ) -> JobStatus {
        let status = JobStatus::new_created(job_name.to_string(), cli_args, output_path, format, now);
        self.entries.lock().insert(job_name.to_string(), status.clone());
        status
    }

    /// Apply `patch` to the existing entry for `job_name`. A patch against a name with no entry is a no-op — in
    /// practice every `job_name` tracked here was created by `submit_single`
    /// before any Watcher can patch it.
    pub fn patch(&self, job_name: &str, patch: JobStatusPatch, now: i64) -> Option<JobStatus> {
        let mut entries = self.entries.lock();
        let current = entries.get_mut(job_name)?;

        if let Some(status) = patch.status {
            current.status = status;
        }
        if let Some(message) = patch.message {
            current.message = message;
        }
        if let Some(logs) = patch.logs {
            current.logs = logs;
        }
        current.updated_at = now;
        current.total_time_s = Some(current.updated_at - current.created_at);

        Some(current.clone())
    }

    pub fn remove(&self, job_name: &str) -> Option<JobStatus> {
        self.entries.lock().remove(job_name)
    }
}

pub fn running_patch() -> JobStatusPatch {
    JobStatusPatch::status(JobPhase::Running)
}
