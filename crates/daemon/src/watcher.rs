//! Watcher Pool: one task per tracked single-processor job,
//! draining `ClusterAdapter::watch_jobs` until a terminal condition, a
//! cooperative stop, or the stream ending without one (`Error`).

use crate::orchestrator::Orchestrator;
use crate::push_channel::ChannelMessage;
use futures_util::StreamExt;
use lidar_core::{JobPhase, JobStatusPatch};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn terminal_phase(condition_type: &str) -> Option<JobPhase> {
    match condition_type {
        "Complete" => Some(JobPhase::Complete),
        "SuccessCriteriaMet" => Some(JobPhase::SuccessCriteriaMet),
        "Failed" => Some(JobPhase::Failed),
        "FailureTarget" => Some(JobPhase::FailureTarget),
        _ => None,
    }
}

/// Starts (or restarts) a Watcher for `job_name`. Registering a new one
/// cancels whatever Watcher was previously tracking the same name.
pub fn spawn(orchestrator: Arc<Orchestrator>, job_name: String) {
    let stop = CancellationToken::new();
    let previous = orchestrator.watchers.lock().insert(job_name.clone(), stop.clone());
    if let Some(previous) = previous {
        previous.cancel();
    }

    tokio::spawn(async move {
        run(orchestrator, job_name, stop).await;
    });
}

async fn run(orchestrator: Arc<Orchestrator>, job_name: String, stop: CancellationToken) {
    let events = match orchestrator.cluster.watch_jobs(&orchestrator.namespace, stop.clone()).await {
        Ok(events) => events,
        Err(err) => {
            tracing::error!(job_name = %job_name, %err, "watcher failed to open job-event stream");
            finish_with_error(&orchestrator, &job_name, &err.to_string()).await;
            return;
        }
    };
    tokio::pin!(events);

    let mut reported_running = false;
    let mut finished_terminally = false;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            event = events.next() => {
                let Some(event) = event else { break };
                if event.name != job_name {
                    continue;
                }

                if !reported_running && event.active_count >= 1 {
                    reported_running = true;
                    apply_patch(&orchestrator, &job_name, crate::registry::running_patch()).await;
                }

                if let Some(phase) = event.conditions.iter()
                    .find(|c| c.status == "True")
                    .and_then(|c| terminal_phase(&c.condition_type))
                {
                    finished_terminally = true;
                    finish_terminal(&orchestrator, &job_name, phase).await;
                    break;
                }
            }
        }
    }

    if stop.is_cancelled() {
        orchestrator.watchers.lock().remove(&job_name);
        return;
    }

    if !finished_terminally {
        tracing::warn!(job_name = %job_name, "job-event stream ended without a terminal condition");
        finish_with_error(&orchestrator, &job_name, "job-event stream ended unexpectedly").await;
    }

    orchestrator.watchers.lock().remove(&job_name);
}

async fn finish_terminal(orchestrator: &Arc<Orchestrator>, job_name: &str, phase: JobPhase) {
    let logs = fetch_pod_log(orchestrator, job_name).await;
    let mut patch = JobStatusPatch::status(phase);
    if let Some(logs) = logs {
        patch = patch.with_logs(logs);
    }
    apply_patch(orchestrator, job_name, patch).await;

    if let Err(err) = orchestrator.cluster.delete_job(job_name, &orchestrator.namespace).await {
        tracing::warn!(job_name = %job_name, %err, "failed to delete terminal cluster job");
    }
}

async fn fetch_pod_log(orchestrator: &Arc<Orchestrator>, job_name: &str) -> Option<String> {
    let selector = format!("job-name={}", job_name);
    match orchestrator.cluster.list_pods(&orchestrator.namespace, &selector).await {
        Ok(pods) => {
            let pod = pods.first()?;
            match orchestrator.cluster.read_pod_log(&pod.name, &orchestrator.namespace).await {
                Ok(log) => Some(log),
                Err(err) => {
                    tracing::warn!(job_name = %job_name, %err, "pod log fetch failed");
                    Some(format!("log fetch failed: {err}"))
                }
            }
        }
        Err(err) => {
            tracing::warn!(job_name = %job_name, %err, "pod lookup failed before log fetch");
            Some(format!("log fetch failed: {err}"))
        }
    }
}

async fn finish_with_error(orchestrator: &Arc<Orchestrator>, job_name: &str, message: &str) {
    apply_patch(orchestrator, job_name, JobStatusPatch::status(JobPhase::Error).with_message(message)).await;
}

async fn apply_patch(orchestrator: &Arc<Orchestrator>, job_name: &str, patch: JobStatusPatch) {
    let now = orchestrator.clock.epoch_s();
    if let Some(status) = orchestrator.registry.patch(job_name, patch, now) {
        orchestrator.notify_subscriber(job_name, ChannelMessage::Status(status)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lidar_catalog::Catalog;
    use lidar_cluster::{ClusterAdapter, FakeClusterAdapter, JobCondition, JobEvent, PodInfo};
    use lidar_core::{Clock, FakeClock};
    use std::time::Duration;

    fn orchestrator(cluster: FakeClusterAdapter) -> Arc<Orchestrator> {
        Orchestrator::new(
            Catalog::open_in_memory().unwrap(),
            Arc::new(cluster),
            std::env::temp_dir(),
            std::env::temp_dir(),
            "default".to_string(),
            "lidar-processor:latest".to_string(),
            Arc::new(FakeClock::new(1_000)) as Arc<dyn Clock>,
        )
    }

    async fn wait_for_terminal(orchestrator: &Arc<Orchestrator>, job_name: &str) -> JobPhase {
        for _ in 0..200 {
            if let Some(status) = orchestrator.registry.get(job_name) {
                if status.status.is_terminal() {
                    return status.status;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {job_name} never reached a terminal phase");
    }

    #[test]
    fn terminal_phase_maps_known_condition_types() {
        assert_eq!(terminal_phase("Complete"), Some(JobPhase::Complete));
        assert_eq!(terminal_phase("SuccessCriteriaMet"), Some(JobPhase::SuccessCriteriaMet));
        assert_eq!(terminal_phase("Failed"), Some(JobPhase::Failed));
        assert_eq!(terminal_phase("FailureTarget"), Some(JobPhase::FailureTarget));
        assert_eq!(terminal_phase("Running"), None);
    }

    #[tokio::test]
    async fn watcher_reaches_running_then_complete_and_attaches_logs() {
        let fake = FakeClusterAdapter::new();
        let job_name = "job-a".to_string();
        fake.create_job(lidar_cluster::JobManifest {
            name: job_name.clone(),
            namespace: "default".to_string(),
            image: "worker:latest".to_string(),
            command: vec![],
            args: vec![],
            env: vec![],
            parallelism: 1,
            backoff_limit: 0,
            ttl_seconds_after_finished: 7200,
            volumes: vec![],
            resources: lidar_cluster::ResourceRequirements::single_processor(),
        })
        .await
        .unwrap();
        fake.script_pods(&job_name, vec![PodInfo { name: "job-a-pod".to_string(), namespace: "default".to_string() }]);
        fake.script_log("job-a-pod", "done\n");
        fake.script_events(
            &job_name,
            vec![
                JobEvent {
                    name: job_name.clone(),
                    phase: "Job".to_string(),
                    conditions: vec![],
                    active_count: 1,
                    start_time: Some(1),
                    completion_time: None,
                },
                JobEvent {
                    name: job_name.clone(),
                    phase: "Job".to_string(),
                    conditions: vec![JobCondition {
                        condition_type: "Complete".to_string(),
                        status: "True".to_string(),
                    }],
                    active_count: 0,
                    start_time: Some(1),
                    completion_time: Some(2),
                },
            ],
        );

        let orchestrator = orchestrator(fake.clone());
        orchestrator.registry.create(&job_name, vec![], "out.bin".to_string(), None, 1_000);

        spawn(Arc::clone(&orchestrator), job_name.clone());

        let phase = wait_for_terminal(&orchestrator, &job_name).await;
        assert_eq!(phase, JobPhase::Complete);

        let status = orchestrator.registry.get(&job_name).unwrap();
        assert_eq!(status.logs.as_deref(), Some("done\n"));
        assert!(!fake.job_exists(&job_name));
    }

    #[tokio::test]
    async fn watcher_reports_error_when_stream_ends_without_terminal_event() {
        let fake = FakeClusterAdapter::new();
        let job_name = "job-b".to_string();
        fake.script_events(
            &job_name,
            vec![JobEvent {
                name: job_name.clone(),
                phase: "Job".to_string(),
                conditions: vec![],
                active_count: 1,
                start_time: Some(1),
                completion_time: None,
            }],
        );

        let orchestrator = orchestrator(fake);
        orchestrator.registry.create(&job_name, vec![], "out.bin".to_string(), None, 1_000);

        spawn(Arc::clone(&orchestrator), job_name.clone());

        let phase = wait_for_terminal(&orchestrator, &job_name).await;
        assert_eq!(phase, JobPhase::Error);
    }

    #[tokio::test]
    async fn cancelling_a_watcher_leaves_status_untouched() {
        let fake = FakeClusterAdapter::new();
        let job_name = "job-c".to_string();

        let orchestrator = orchestrator(fake);
        orchestrator.registry.create(&job_name, vec![], "out.bin".to_string(), None, 1_000);

        spawn(Arc::clone(&orchestrator), job_name.clone());
        let stop = orchestrator.watchers.lock().get(&job_name).cloned().unwrap();
        stop.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let status = orchestrator.registry.get(&job_name).unwrap();
        assert_eq!(status.status, JobPhase::Created);
    }
}
