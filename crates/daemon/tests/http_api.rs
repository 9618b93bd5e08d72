//! End-to-end tests against the Job Orchestrator API's HTTP and WebSocket
//! surface, with a `FakeClusterAdapter` standing in for a real cluster.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use futures_util::{SinkExt, StreamExt};
use lidar_catalog::Catalog;
use lidar_cluster::FakeClusterAdapter;
use lidar_core::{Clock, FakeClock, JobPhase};
use lidar_daemon::http;
use lidar_daemon::orchestrator::Orchestrator;
use std::sync::Arc;
use tempfile::tempdir;
use tokio_tungstenite::tungstenite::Message;

struct TestApp {
    base_url: String,
    orchestrator: Arc<Orchestrator>,
    _output_dir: tempfile::TempDir,
}

async fn spawn_app() -> TestApp {
    let output_dir = tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        Catalog::open_in_memory().unwrap(),
        Arc::new(FakeClusterAdapter::new()),
        output_dir.path().to_path_buf(),
        std::path::PathBuf::from("/data"),
        "default".to_string(),
        "lidar-processor:latest".to_string(),
        Arc::new(FakeClock::new(1_000)) as Arc<dyn Clock>,
    );

    let router = http::router(Arc::clone(&orchestrator));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { base_url: format!("http://{addr}"), orchestrator, _output_dir: output_dir }
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = spawn_app().await;
    let resp = reqwest::get(format!("{}/health", app.base_url)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["timestamp"], 1_000);
}

#[tokio::test]
async fn start_job_rejects_path_outside_data_root() {
    let app = spawn_app().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/start-job", app.base_url))
        .json(&serde_json::json!({ "file_path": "/etc/passwd" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error_type"], "value_error");
}

#[tokio::test]
async fn start_job_then_status_then_stop() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let start: serde_json::Value = client
        .post(format!("{}/start-job", app.base_url))
        .json(&serde_json::json!({ "file_path": "/data/scan.las", "format": "lasv14" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let job_name = start["job_name"].as_str().unwrap().to_string();
    assert_eq!(start["status_url"], format!("/job-status/{job_name}"));

    // The fake cluster adapter has no scripted events for this job, so the
    // Watcher may already have transitioned it to `error` by the time we
    // poll; only the identity fields are guaranteed stable.
    let status: serde_json::Value =
        reqwest::get(format!("{}/job-status/{job_name}", app.base_url)).await.unwrap().json().await.unwrap();
    assert_eq!(status["job_name"], job_name);
    assert_eq!(status["format"], "lasv14");

    let stop_resp = client.delete(format!("{}/stop-job/{job_name}", app.base_url)).send().await.unwrap();
    assert_eq!(stop_resp.status(), reqwest::StatusCode::OK);

    let after_stop = reqwest::get(format!("{}/job-status/{job_name}", app.base_url)).await.unwrap();
    assert_eq!(after_stop.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_job_is_idempotent_for_unknown_name() {
    let app = spawn_app().await;
    let resp =
        reqwest::Client::new().delete(format!("{}/stop-job/does-not-exist", app.base_url)).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn download_before_completion_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let start: serde_json::Value = client
        .post(format!("{}/start-job", app.base_url))
        .json(&serde_json::json!({ "file_path": "/data/scan.las" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let job_name = start["job_name"].as_str().unwrap();

    let resp = reqwest::get(format!("{}/download/{job_name}", app.base_url)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_after_completion_serves_artifact_with_content_type() {
    let app = spawn_app().await;
    let job_name = "pre-seeded-job";
    let output_path = "pre-seeded-job.laz";
    std::fs::write(app._output_dir.path().join(output_path), b"laz bytes").unwrap();

    app.orchestrator.registry.create(
        job_name,
        vec!["/data/scan.las".to_string()],
        output_path.to_string(),
        Some("lasv14".to_string()),
        1_000,
    );
    app.orchestrator.registry.patch(job_name, lidar_core::JobStatusPatch::status(JobPhase::Complete), 1_100);

    let resp = reqwest::get(format!("{}/download/{job_name}", app.base_url)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let disposition = resp.headers().get(reqwest::header::CONTENT_DISPOSITION).unwrap().to_str().unwrap().to_string();
    assert!(disposition.contains(job_name));
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(&bytes[..], b"laz bytes");
}

#[tokio::test]
async fn websocket_sends_placeholder_snapshot_for_untracked_job() {
    let app = spawn_app().await;
    let ws_url = format!("{}/ws/job-status/untracked-job", app.base_url.replacen("http://", "ws://", 1));

    let (mut socket, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();
    let message = socket.next().await.unwrap().unwrap();
    let Message::Text(text) = message else { panic!("expected a text frame") };
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["job_name"], "untracked-job");
    assert_eq!(parsed["status"], "pending");

    socket.send(Message::Text("close".into())).await.unwrap();
}

#[tokio::test]
async fn catalog_routes_expose_folders_and_missions() {
    let app = spawn_app().await;

    app.orchestrator
        .catalog
        .upsert_folder_on_change(
            "mission-a/folder-a",
            &lidar_catalog::FolderUpdate {
                mission_key: "mission-a".to_string(),
                fingerprint: "abc123".to_string(),
                size_kb: 10,
                file_count: 3,
                output_path: "archive/mission-a/folder-a.zip".to_string(),
            },
            1_000,
        )
        .unwrap();

    let folders: serde_json::Value =
        reqwest::get(format!("{}/catalog/folders", app.base_url)).await.unwrap().json().await.unwrap();
    assert_eq!(folders.as_array().unwrap().len(), 1);

    let matches: serde_json::Value = reqwest::get(format!("{}/catalog/folders/mission-a/folder-a", app.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(matches.as_array().unwrap().len(), 1);
    assert_eq!(matches[0]["fingerprint"], "abc123");

    let prefix_matches: serde_json::Value =
        reqwest::get(format!("{}/catalog/folders/mission-a", app.base_url)).await.unwrap().json().await.unwrap();
    assert_eq!(prefix_matches.as_array().unwrap().len(), 1);

    let missing = reqwest::get(format!("{}/catalog/missions/no-such-mission", app.base_url)).await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
