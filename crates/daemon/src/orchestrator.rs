//! `Orchestrator` — explicit shared state passed as `axum::extract::State`
//! into every handler.

use crate::registry::StatusRegistry;
use lidar_catalog::Catalog;
use lidar_cluster::ClusterAdapter;
use lidar_core::Clock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Single live subscriber per job name, paired with the `CancellationToken`
/// that tells its `handle_socket` loop to close. Registering a new
/// subscriber cancels the previous one's token so its connection actually
/// terminates instead of idling until its next keepalive send fails.
pub type ChannelTable =
    Arc<parking_lot::Mutex<HashMap<String, (mpsc::Sender<crate::push_channel::ChannelMessage>, CancellationToken)>>>;

/// At most one Watcher per job name.
pub type WatcherTable = Arc<parking_lot::Mutex<HashMap<String, CancellationToken>>>;

pub struct Orchestrator {
    pub catalog: Catalog,
    pub cluster: Arc<dyn ClusterAdapter>,
    pub registry: StatusRegistry,
    pub channels: ChannelTable,
    pub watchers: WatcherTable,
    pub output_root: PathBuf,
    pub data_root: PathBuf,
    pub namespace: String,
    pub processor_image: String,
    pub clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(
        catalog: Catalog,
        cluster: Arc<dyn ClusterAdapter>,
        output_root: PathBuf,
        data_root: PathBuf,
        namespace: String,
        processor_image: String,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            cluster,
            registry: StatusRegistry::new(),
            channels: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            watchers: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            output_root,
            data_root,
            namespace,
            processor_image,
            clock,
        })
    }

    /// Deliver the current status to `job_name`'s subscriber, if any,
    /// dropping (unregistering) it on send failure.
    pub async fn notify_subscriber(&self, job_name: &str, status: crate::push_channel::ChannelMessage) {
        let sender = self.channels.lock().get(job_name).map(|(tx, _)| tx.clone());
        if let Some(sender) = sender {
            if sender.send(status).await.is_err() {
                self.channels.lock().remove(job_name);
            }
        }
    }
}
