//! Push Channels: one bidirectional WebSocket stream per
//! tracked job, keyed by `job_name`. One task drains an outbound `mpsc` into
//! the socket; the main loop reads inbound frames and replies with the
//! current snapshot.

use crate::orchestrator::Orchestrator;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use lidar_core::{JobPhase, JobStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(30);
const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChannelMessage {
    Status(JobStatus),
    Ping {
        #[serde(rename = "type")]
        kind: &'static str,
        job_name: String,
    },
}

impl ChannelMessage {
    fn ping(job_name: &str) -> Self {
        ChannelMessage::Ping { kind: "ping", job_name: job_name.to_string() }
    }
}

pub async fn handler(
    ws: WebSocketUpgrade,
    Path(job_name): Path<String>,
    State(orchestrator): State<Arc<Orchestrator>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, job_name, orchestrator))
}

async fn handle_socket(socket: WebSocket, job_name: String, orchestrator: Arc<Orchestrator>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ChannelMessage>(CHANNEL_CAPACITY);

    // Step 1: snapshot (or a synthetic Pending status if untracked).
    let snapshot = orchestrator.registry.get(&job_name).unwrap_or_else(|| pending_placeholder(&job_name));
    if tx.send(ChannelMessage::Status(snapshot)).await.is_err() {
        return;
    }

    // Step 2: register as the live subscriber, cancelling any previous one's
    // token so its connection actually closes instead of idling.
    let cancel = CancellationToken::new();
    let previous = orchestrator.channels.lock().insert(job_name.clone(), (tx.clone(), cancel.clone()));
    if let Some((_, previous_cancel)) = previous {
        previous_cancel.cancel();
    }

    let outbound_job_name = job_name.clone();
    let outbound = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&message) else { continue };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        tracing::debug!(job_name = %outbound_job_name, "push channel outbound task exited");
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            read = tokio::time::timeout(KEEPALIVE_TIMEOUT, stream.next()) => match read {
                Ok(Some(Ok(Message::Text(text)))) => {
                    if text.trim() == "close" {
                        break;
                    }
                    if reply_with_snapshot(&orchestrator, &job_name, &tx).await.is_err() {
                        break;
                    }
                }
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
                Ok(Some(Ok(_))) => {
                    if reply_with_snapshot(&orchestrator, &job_name, &tx).await.is_err() {
                        break;
                    }
                }
                Ok(Some(Err(err))) => {
                    tracing::warn!(job_name = %job_name, %err, "push channel read error");
                    break;
                }
                Err(_elapsed) => {
                    if tx.send(ChannelMessage::ping(&job_name)).await.is_err() {
                        break;
                    }
                }
            },
        }
    }

    let mut channels = orchestrator.channels.lock();
    if channels.get(&job_name).map(|(s, _)| s.same_channel(&tx)).unwrap_or(false) {
        channels.remove(&job_name);
    }
    drop(channels);
    outbound.abort();
}

async fn reply_with_snapshot(
    orchestrator: &Orchestrator,
    job_name: &str,
    tx: &mpsc::Sender<ChannelMessage>,
) -> Result<(), mpsc::error::SendError<ChannelMessage>> {
    let snapshot = orchestrator.registry.get(job_name).unwrap_or_else(|| pending_placeholder(job_name));
    tx.send(ChannelMessage::Status(snapshot)).await
}

fn pending_placeholder(job_name: &str) -> JobStatus {
    JobStatus {
        job_name: job_name.to_string(),
        status: JobPhase::Pending,
        message: None,
        created_at: 0,
        updated_at: 0,
        total_time_s: None,
        cli_args: vec![],
        output_path: String::new(),
        logs: None,
        format: None,
    }
}
