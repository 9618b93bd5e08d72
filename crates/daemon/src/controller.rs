//! Job Controller: owns job submission and termination.
//! Lifecycle tracking itself lives in the Status Registry and Watcher Pool;
//! this module only ever does the synchronous "kick it off" half.

use crate::orchestrator::Orchestrator;
use crate::watcher;
use lidar_cluster::ClusterError;
use lidar_core::{single_job_name, unique_output_filename, ValidatedRequest};
use lidar_jobs::{render_single_processor, SingleOptions};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

/// Builds a single-processor job for `request`, submits it, records a
/// `Created` Registry entry, and starts its Watcher. Returns promptly — it
/// never waits for the job to run.
pub async fn submit_single(
    orchestrator: &Arc<Orchestrator>,
    request: ValidatedRequest,
) -> Result<String, ControllerError> {
    let job_name = single_job_name();
    let unique_filename = unique_output_filename();
    let cli_args = request.to_cli_arguments();

    let opts = SingleOptions {
        image: orchestrator.processor_image.clone(),
        namespace: orchestrator.namespace.clone(),
        data_root: orchestrator.data_root.clone(),
        output_root: orchestrator.output_root.clone(),
    };
    let manifest = render_single_processor(&cli_args, job_name.clone(), unique_filename.clone(), &opts);

    orchestrator.cluster.create_job(manifest).await?;

    let now = orchestrator.clock.epoch_s();
    orchestrator.registry.create(&job_name, cli_args, unique_filename, request.format.clone(), now);

    watcher::spawn(Arc::clone(orchestrator), job_name.clone());

    Ok(job_name)
}

/// Tears down everything tracked for `job_name`: deletes the cluster job,
/// cancels its Watcher, closes its Push Channel, drops its Registry entry,
/// and removes the output artifact if one was written. Idempotent — safe to
/// call on an already-terminal or already-removed job.
pub async fn stop(orchestrator: &Arc<Orchestrator>, job_name: &str) -> Result<(), ControllerError> {
    match orchestrator.cluster.delete_job(job_name, &orchestrator.namespace).await {
        Ok(()) | Err(ClusterError::NotFound(_)) => {}
        Err(err) => return Err(err.into()),
    }

    if let Some(stop) = orchestrator.watchers.lock().remove(job_name) {
        stop.cancel();
    }
    if let Some((_, cancel)) = orchestrator.channels.lock().remove(job_name) {
        cancel.cancel();
    }

    if let Some(status) = orchestrator.registry.remove(job_name) {
        if !status.output_path.is_empty() {
            let artifact = orchestrator.output_root.join(&status.output_path);
            if artifact.exists() {
                if let Err(err) = std::fs::remove_file(&artifact) {
                    tracing::warn!(job_name = %job_name, %err, "failed to remove output artifact on stop");
                }
            }
        }
    }

    Ok(())
}
