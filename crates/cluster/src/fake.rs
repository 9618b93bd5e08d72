//! In-memory `ClusterAdapter` for tests: no network, scripted event streams.

use crate::error::ClusterError;
use crate::manifest::{JobEvent, JobManifest, PodInfo};
use crate::ClusterAdapter;
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// One call recorded by `FakeClusterAdapter`, inspectable from test code.
#[derive(Debug, Clone)]
pub enum ScriptedCall {
    CreateJob(String),
    DeleteJob(String),
    WatchJobs(String),
    ListPods(String),
    ReadPodLog(String),
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, ()>,
    pods: HashMap<String, Vec<PodInfo>>,
    logs: HashMap<String, String>,
    event_streams: HashMap<String, Vec<JobEvent>>,
    calls: Vec<ScriptedCall>,
}

/// In-memory `ClusterAdapter` used by controller/watcher tests; event
/// streams are pre-scripted per job name via `script_events`.
#[derive(Clone, Default)]
pub struct FakeClusterAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl FakeClusterAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_events(&self, job_name: &str, events: Vec<JobEvent>) {
        self.inner.lock().event_streams.insert(job_name.to_string(), events);
    }

    pub fn script_pods(&self, job_name: &str, pods: Vec<PodInfo>) {
        self.inner.lock().pods.insert(job_name.to_string(), pods);
    }

    pub fn script_log(&self, pod: &str, log: &str) {
        self.inner.lock().logs.insert(pod.to_string(), log.to_string());
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.inner.lock().calls.clone()
    }

    pub fn job_exists(&self, name: &str) -> bool {
        self.inner.lock().jobs.contains_key(name)
    }
}

#[async_trait]
impl ClusterAdapter for FakeClusterAdapter {
    async fn create_job(&self, manifest: JobManifest) -> Result<String, ClusterError> {
        let mut inner = self.inner.lock();
        if inner.jobs.contains_key(&manifest.name) {
            return Err(ClusterError::AlreadyExists(manifest.name));
        }
        inner.jobs.insert(manifest.name.clone(), ());
        inner.calls.push(ScriptedCall::CreateJob(manifest.name.clone()));
        Ok(manifest.name)
    }

    async fn delete_job(&self, name: &str, _namespace: &str) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ScriptedCall::DeleteJob(name.to_string()));
        if inner.jobs.remove(name).is_none() {
            return Err(ClusterError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn watch_jobs(
        &self,
        namespace: &str,
        stop: CancellationToken,
    ) -> Result<BoxStream<'static, JobEvent>, ClusterError> {
        self.inner.lock().calls.push(ScriptedCall::WatchJobs(namespace.to_string()));

        let events: Vec<JobEvent> =
            self.inner.lock().event_streams.values().flat_map(|v| v.clone()).collect();

        let (tx, rx) = mpsc::channel(events.len().max(1));
        tokio::spawn(async move {
            for event in events {
                if stop.is_cancelled() || tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn list_pods(&self, _namespace: &str, selector: &str) -> Result<Vec<PodInfo>, ClusterError> {
        let job_name = selector.strip_prefix("job-name=").unwrap_or(selector);
        let mut inner = self.inner.lock();
        inner.calls.push(ScriptedCall::ListPods(job_name.to_string()));
        Ok(inner.pods.get(job_name).cloned().unwrap_or_default())
    }

    async fn read_pod_log(&self, pod: &str, _namespace: &str) -> Result<String, ClusterError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ScriptedCall::ReadPodLog(pod.to_string()));
        inner.logs.get(pod).cloned().ok_or_else(|| ClusterError::NotFound(pod.to_string()))
    }
}
