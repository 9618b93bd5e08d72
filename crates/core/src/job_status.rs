//! In-memory job status tracked by the Status Registry.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a tracked cluster job.
///
/// `Pending` is never assigned to a real Registry entry — it is the synthetic
/// status a Push Channel reports for a `job_name` nothing has been created
/// for yet. `Created -> Running -> {terminal}` covers every tracked job. The
/// four non-`Error` terminal variants come from the cluster's own
/// job-condition vocabulary (batch "complete" vs a user-defined
/// success-criteria condition, and the analogous failure pair); `Error` is
/// never cluster-reported — it means the Watcher itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Pending,
    Created,
    Running,
    Complete,
    SuccessCriteriaMet,
    Failed,
    FailureTarget,
    Error,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobPhase::Pending | JobPhase::Created | JobPhase::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobPhase::Complete | JobPhase::SuccessCriteriaMet)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobPhase::Failed | JobPhase::FailureTarget | JobPhase::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Pending => "Pending",
            JobPhase::Created => "Created",
            JobPhase::Running => "Running",
            JobPhase::Complete => "Complete",
            JobPhase::SuccessCriteriaMet => "SuccessCriteriaMet",
            JobPhase::Failed => "Failed",
            JobPhase::FailureTarget => "FailureTarget",
            JobPhase::Error => "Error",
        }
    }
}

/// Latest known status of one cluster job, as held by the Status Registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_name: String,
    pub status: JobPhase,
    pub message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub total_time_s: Option<i64>,
    pub cli_args: Vec<String>,
    pub output_path: String,
    pub logs: Option<String>,
    /// The request's `format` field, carried along so `/download` can derive
    /// a content type without re-parsing `cli_args`.
    pub format: Option<String>,
}

impl JobStatus {
    pub fn new_created(
        job_name: String,
        cli_args: Vec<String>,
        output_path: String,
        format: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            job_name,
            status: JobPhase::Created,
            message: None,
            created_at: now,
            updated_at: now,
            total_time_s: None,
            cli_args,
            output_path,
            logs: None,
            format,
        }
    }
}

/// A sparse update applied to a `JobStatus` by the Status Registry: every field is optional, and a `None` means "leave unchanged" — no
/// field is ever cleared by omission, only by an explicit `Some(None)` on the
/// nested `Option` fields.
#[derive(Debug, Clone, Default)]
pub struct JobStatusPatch {
    pub status: Option<JobPhase>,
    pub message: Option<Option<String>>,
    pub logs: Option<Option<String>>,
}

impl JobStatusPatch {
    pub fn status(status: JobPhase) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(Some(message.into()));
        self
    }

    pub fn with_logs(mut self, logs: impl Into<String>) -> Self {
        self.logs = Some(Some(logs.into()));
        self
    }
}
