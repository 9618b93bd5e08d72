use thiserror::Error;

/// `Busy` is retryable (lock contention past the busy timeout); `Fatal`
/// covers schema/open failures and is propagated to the caller.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog busy: {0}")]
    Busy(String),
    #[error("catalog error: {0}")]
    Fatal(String),
}

impl CatalogError {
    pub(crate) fn fatal(err: rusqlite::Error) -> Self {
        CatalogError::Fatal(err.to_string())
    }

    pub(crate) fn from_rusqlite(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::DatabaseBusy || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                CatalogError::Busy(err.to_string())
            }
            other => CatalogError::Fatal(other.to_string()),
        }
    }
}
