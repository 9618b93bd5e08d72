//! Error kinds shared across crates.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while validating a `PointCloudRequest`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("value error: {0}")]
    Value(String),
}

impl RequestError {
    pub fn error_type(&self) -> &'static str {
        match self {
            RequestError::Validation(_) => "validation_error",
            RequestError::Value(_) => "value_error",
        }
    }
}

/// The `{status, error_type, error_details, output}` envelope 
/// requires for every recoverable local failure surfaced to a caller.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error_type: String,
    pub error_details: serde_json::Value,
    pub output: String,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: "error",
            error_type: error_type.into(),
            error_details: serde_json::json!({ "message": message }),
            output: message,
        }
    }
}

impl From<RequestError> for ErrorResponse {
    fn from(err: RequestError) -> Self {
        ErrorResponse::new(err.error_type(), err.to_string())
    }
}
