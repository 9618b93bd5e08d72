//! Declarative job shape handed from the Job Builder to a `ClusterAdapter`
//!.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VolumeBinding {
    pub name: String,
    pub host_path: PathBuf,
    pub mount_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceRequirements {
    pub request_cpu_millis: u32,
    pub request_memory_mib: u32,
    pub limit_cpu_millis: u32,
    pub limit_memory_mib: u32,
}

impl ResourceRequirements {
    /// Single-processor recipe's fixed request/limit pair.
    pub fn single_processor() -> Self {
        Self { request_cpu_millis: 500, request_memory_mib: 128, limit_cpu_millis: 1000, limit_memory_mib: 256 }
    }
}

/// A fully-rendered job, ready for `ClusterAdapter::create_job`.
#[derive(Debug, Clone)]
pub struct JobManifest {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub parallelism: i32,
    pub backoff_limit: i32,
    pub ttl_seconds_after_finished: i32,
    pub volumes: Vec<VolumeBinding>,
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCondition {
    pub condition_type: String,
    pub status: String,
}

/// One lifecycle event from `ClusterAdapter::watch_jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub name: String,
    pub phase: String,
    pub conditions: Vec<JobCondition>,
    pub active_count: i32,
    pub start_time: Option<i64>,
    pub completion_time: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
}
