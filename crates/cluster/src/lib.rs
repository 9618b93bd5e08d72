//! Abstract cluster-job backend.
//!
//! `ClusterAdapter` is the one seam between the orchestration logic and an
//! actual batch scheduler; `KubernetesAdapter` is the real implementation,
//! `FakeClusterAdapter` is an in-memory stand-in for tests.
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod fake;
mod k8s;
mod manifest;

pub use error::ClusterError;
pub use fake::{FakeClusterAdapter, ScriptedCall};
pub use k8s::KubernetesAdapter;
pub use manifest::{JobCondition, JobEvent, JobManifest, PodInfo, ResourceRequirements, VolumeBinding};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait ClusterAdapter: Send + Sync + 'static {
    /// Submit a job. Returns the server-assigned name; `AlreadyExists` if the
    /// manifest's name collides with a live job.
    async fn create_job(&self, manifest: JobManifest) -> Result<String, ClusterError>;

    /// Best-effort deletion; propagation happens in the background.
    /// `NotFound` is treated as non-fatal by callers.
    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), ClusterError>;

    /// Push stream of job lifecycle events for `namespace`. Ends when
    /// `stop` fires or the server closes the connection.
    async fn watch_jobs(
        &self,
        namespace: &str,
        stop: CancellationToken,
    ) -> Result<BoxStream<'static, JobEvent>, ClusterError>;

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodInfo>, ClusterError>;

    async fn read_pod_log(&self, pod: &str, namespace: &str) -> Result<String, ClusterError>;
}
