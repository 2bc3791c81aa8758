use riskref_core::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no snapshot for version {0}")]
    SnapshotNotFound(String),

    #[error("no results for query")]
    NoResults,

    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for SinkError {
    fn from(err: StoreError) -> Self {
        SinkError::backend(err)
    }
}
