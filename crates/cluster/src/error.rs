use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job already exists: {0}")]
    AlreadyExists(String),
    #[error("cluster transport error: {0}")]
    Transport(String),
}
