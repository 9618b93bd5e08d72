//! Kubernetes-backed `ClusterAdapter`.
//!
//! Jobs are rendered from `JobManifest` into `batch/v1::Job` specs and
//! watched by polling rather than a long-lived watch stream, since
//! `batch/v1::Job` status updates are infrequent and a poll is simpler to
//! reason about under reconnects. Every rendered Job runs exactly one pod —
//! batch recipes that process many items do so inside that single pod's
//! script, not by spreading items across multiple pods.

use crate::error::ClusterError;
use crate::manifest::{JobCondition, JobEvent, JobManifest, PodInfo, VolumeBinding};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use k8s_openapi::api::batch::v1::{Job, JobCondition as K8sJobCondition, JobSpec, JobStatus};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, HostPathVolumeSource, Pod, PodSpec, PodTemplateSpec, ResourceRequirements as K8sResources,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::{Client, Config};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct KubernetesAdapter {
    client: Client,
}

impl KubernetesAdapter {
    /// Two authentication strategies attempted in order: external kubeconfig,
    /// then in-cluster service-account config. First success wins; both
    /// failing is fatal.
    pub async fn connect() -> Result<Self, ClusterError> {
        if let Ok(client) = Client::try_default().await {
            return Ok(Self { client });
        }

        let config = Config::incluster()
            .map_err(|e| ClusterError::Transport(format!("no kubeconfig and in-cluster config failed: {}", e)))?;
        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Transport(format!("failed to build in-cluster client: {}", e)))?;
        Ok(Self { client })
    }

    fn jobs_api(&self, namespace: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods_api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn quantity_cpu_millis(millis: u32) -> Quantity {
    Quantity(format!("{}m", millis))
}

fn quantity_mib(mib: u32) -> Quantity {
    Quantity(format!("{}Mi", mib))
}

fn build_job(manifest: &JobManifest) -> Job {
    let mut volumes = Vec::new();
    let mut volume_mounts = Vec::new();
    for VolumeBinding { name, host_path, mount_path, read_only } in &manifest.volumes {
        volumes.push(Volume {
            name: name.clone(),
            host_path: Some(HostPathVolumeSource { path: host_path.display().to_string(), type_: None }),
            ..Default::default()
        });
        volume_mounts.push(VolumeMount {
            name: name.clone(),
            mount_path: mount_path.clone(),
            read_only: Some(*read_only),
            ..Default::default()
        });
    }

    let mut requests = BTreeMap::new();
    requests.insert("cpu".to_string(), quantity_cpu_millis(manifest.resources.request_cpu_millis));
    requests.insert("memory".to_string(), quantity_mib(manifest.resources.request_memory_mib));
    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), quantity_cpu_millis(manifest.resources.limit_cpu_millis));
    limits.insert("memory".to_string(), quantity_mib(manifest.resources.limit_memory_mib));

    let container = Container {
        name: "worker".to_string(),
        image: Some(manifest.image.clone()),
        command: Some(manifest.command.clone()),
        args: Some(manifest.args.clone()),
        env: Some(
            manifest
                .env
                .iter()
                .map(|(k, v)| EnvVar { name: k.clone(), value: Some(v.clone()), ..Default::default() })
                .collect(),
        ),
        volume_mounts: Some(volume_mounts),
        resources: Some(K8sResources { requests: Some(requests), limits: Some(limits), ..Default::default() }),
        ..Default::default()
    };

    let mut labels = BTreeMap::new();
    labels.insert("job-name".to_string(), manifest.name.clone());

    Job {
        metadata: kube::core::ObjectMeta {
            name: Some(manifest.name.clone()),
            namespace: Some(manifest.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            // `manifest.parallelism` caps concurrency *inside* the pod's own
            // script (batch recipes fan items out with `xargs -P`); the Job
            // itself is always exactly one pod, so `parallelism`/`completions`
            // stay pinned at 1 regardless of that value.
            parallelism: Some(1),
            completions: Some(1),
            backoff_limit: Some(manifest.backoff_limit),
            ttl_seconds_after_finished: Some(manifest.ttl_seconds_after_finished),
            template: PodTemplateSpec {
                metadata: Some(kube::core::ObjectMeta { labels: Some(labels), ..Default::default() }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(volumes),
                    restart_policy: Some("Never".to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

fn to_job_event(name: &str, status: Option<&JobStatus>) -> JobEvent {
    let status = status.cloned().unwrap_or_default();
    let conditions = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .map(|c: K8sJobCondition| JobCondition { condition_type: c.type_, status: c.status })
        .collect();

    JobEvent {
        name: name.to_string(),
        phase: "Job".to_string(),
        conditions,
        active_count: status.active.unwrap_or(0),
        start_time: status.start_time.map(|t| t.0.timestamp()),
        completion_time: status.completion_time.map(|t| t.0.timestamp()),
    }
}

#[async_trait]
impl crate::ClusterAdapter for KubernetesAdapter {
    async fn create_job(&self, manifest: JobManifest) -> Result<String, ClusterError> {
        let api = self.jobs_api(&manifest.namespace);
        let job = build_job(&manifest);
        match api.create(&PostParams::default(), &job).await {
            Ok(created) => Ok(created.metadata.name.unwrap_or(manifest.name)),
            Err(kube::Error::Api(err)) if err.code == 409 => Err(ClusterError::AlreadyExists(manifest.name)),
            Err(err) => Err(ClusterError::Transport(err.to_string())),
        }
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), ClusterError> {
        let api = self.jobs_api(namespace);
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(err) => Err(ClusterError::Transport(err.to_string())),
        }
    }

    async fn watch_jobs(
        &self,
        namespace: &str,
        stop: CancellationToken,
    ) -> Result<BoxStream<'static, JobEvent>, ClusterError> {
        let api = self.jobs_api(namespace);

        let events = stream::unfold((api, stop), move |(api, stop)| async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => return None,
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }

                match api.list(&ListParams::default()).await {
                    Ok(list) => {
                        let events: Vec<JobEvent> = list
                            .items
                            .iter()
                            .filter_map(|job| job.metadata.name.as_ref().map(|name| to_job_event(name, job.status.as_ref())))
                            .collect();
                        if !events.is_empty() {
                            return Some((stream::iter(events), (api, stop)));
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, "job list poll failed");
                    }
                }
            }
        })
        .flatten();

        Ok(events.boxed())
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodInfo>, ClusterError> {
        let api = self.pods_api(namespace);
        let list = api
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|pod| pod.metadata.name.map(|name| PodInfo { name, namespace: namespace.to_string() }))
            .collect())
    }

    async fn read_pod_log(&self, pod: &str, namespace: &str) -> Result<String, ClusterError> {
        let api = self.pods_api(namespace);
        api.logs(pod, &LogParams::default()).await.map_err(|e| ClusterError::Transport(e.to_string()))
    }
}
