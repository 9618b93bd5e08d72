//! Request Front End: the REST surface wired onto the
//! `Orchestrator` as `axum::extract::State`.

use crate::controller;
use crate::error::ApiError;
use crate::orchestrator::Orchestrator;
use crate::push_channel;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use lidar_core::content_type;
use lidar_core::PointCloudRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/start-job", post(start_job))
        .route("/job-status/{job_name}", get(job_status))
        .route("/stop-job/{job_name}", delete(stop_job))
        .route("/download/{job_name}", get(download))
        .route("/ws/job-status/{job_name}", get(push_channel::handler))
        .route("/catalog/folders", get(list_folders))
        .route("/catalog/folders/{*subpath}", get(get_folder))
        .route("/catalog/missions/{mission_key}", get(get_mission))
        .route("/catalog/manifests", get(list_manifests))
        .with_state(orchestrator)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn health(State(orchestrator): State<Arc<Orchestrator>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", timestamp: orchestrator.clock.epoch_s() })
}

#[derive(Debug, Serialize)]
struct StartJobResponse {
    job_name: String,
    status_url: String,
}

async fn start_job(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<PointCloudRequest>,
) -> Result<Json<StartJobResponse>, ApiError> {
    let validated = request.validate()?;
    let job_name = controller::submit_single(&orchestrator, validated).await?;
    Ok(Json(StartJobResponse { status_url: format!("/job-status/{}", job_name), job_name }))
}

async fn job_status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(job_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    orchestrator.registry.get(&job_name).map(Json).ok_or(ApiError::JobNotFound(job_name))
}

#[derive(Debug, Serialize)]
struct StopJobResponse {
    job_name: String,
    status: String,
}

async fn stop_job(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(job_name): Path<String>,
) -> Result<Json<StopJobResponse>, ApiError> {
    controller::stop(&orchestrator, &job_name).await?;
    Ok(Json(StopJobResponse { job_name, status: "Job stopped successfully".to_string() }))
}

async fn download(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(job_name): Path<String>,
) -> Result<Response, ApiError> {
    let status = orchestrator.registry.get(&job_name).ok_or_else(|| ApiError::JobNotFound(job_name.clone()))?;
    if !status.status.is_success() {
        return Err(ApiError::ArtifactMissing(job_name));
    }

    let artifact_path = orchestrator.output_root.join(&status.output_path);
    let bytes = tokio::fs::read(&artifact_path).await.map_err(|_| ApiError::ArtifactMissing(job_name.clone()))?;

    let (suffix, media_type) = content_type::resolve(status.format.as_deref());
    let filename = format!("{job_name}{suffix}");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, media_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ListFoldersQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn list_folders(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(query): Query<ListFoldersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);
    let folders = orchestrator.catalog.list_all_folders(limit, offset)?;
    Ok(Json(folders))
}

async fn get_folder(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(subpath): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let matches = orchestrator.catalog.list_folders_by_prefix(&subpath)?;
    if matches.is_empty() {
        return Err(ApiError::JobNotFound(subpath));
    }
    Ok(Json(matches))
}

async fn get_mission(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(mission_key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    orchestrator
        .catalog
        .get_mission(&mission_key)?
        .map(Json)
        .ok_or(ApiError::JobNotFound(mission_key))
}

async fn list_manifests(State(orchestrator): State<Arc<Orchestrator>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(orchestrator.catalog.list_all_missions()?))
}
