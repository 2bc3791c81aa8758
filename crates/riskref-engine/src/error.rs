use std::path::PathBuf;

use riskref_core::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source document not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to read source document {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed source document {}: {source}", path.display())]
    SourceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog version is empty: declare metadata.version or pass one explicitly")]
    MissingVersion,

    #[error("failed to encode source payload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("publish aborted: {0}")]
    Sink(#[from] SinkError),
}
