//! HTTP error mapping: every recoverable failure becomes the
//! `{status, error_type, error_details, output}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crate::controller::ControllerError;
use lidar_catalog::CatalogError;
use lidar_cluster::ClusterError;
use lidar_core::{ErrorResponse, RequestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("artifact not ready or missing for job {0}")]
    ArtifactMissing(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match &self {
            ApiError::Request(err) => (StatusCode::BAD_REQUEST, ErrorResponse::from(err.clone())),
            ApiError::Catalog(CatalogError::Busy(msg)) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorResponse::new("catalog_busy", msg.clone()))
            }
            ApiError::Catalog(CatalogError::Fatal(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new("catalog_error", msg.clone()))
            }
            ApiError::Cluster(err) => {
                (StatusCode::BAD_GATEWAY, ErrorResponse::new("cluster_error", err.to_string()))
            }
            ApiError::Controller(err) => {
                (StatusCode::BAD_GATEWAY, ErrorResponse::new("controller_error", err.to_string()))
            }
            ApiError::JobNotFound(name) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("not_found", format!("no such job: {name}")))
            }
            ApiError::ArtifactMissing(name) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("artifact_missing", format!("no artifact for job: {name}")))
            }
        };
        (code, Json(body)).into_response()
    }
}
