use std::time::Duration;

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The backend was used after `close`.
    #[error("{0} storage is closed")]
    Closed(&'static str),

    #[error("blocking storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Free-form failure, used by test doubles and wrappers.
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Yaml(#[from] serde_yml::Error),
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("transport error: {0}")]
    Transport(#[from] hyper::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Reasons an ingestion request is rejected.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read request body")]
    ReadBody(#[source] hyper::Error),

    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Failed to store webhook")]
    Storage(#[source] StorageError),
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::ReadBody(_) | IngestError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
