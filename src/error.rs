use std::path::PathBuf;
use thiserror::Error;

use crate::models::QueryId;

/// Errors raised while loading inputs, querying backends, or writing reports
#[derive(Error, Debug)]
pub enum EvalError {
    /// A line of a JSONL input could not be decoded
    #[error("Data format error in {path}:{line}: {message}")]
    DataFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A file could not be read or written
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One (query, backend) call failed
    #[error("Backend error: backend={backend}, qid={query_id}: {source}")]
    Backend {
        backend: String,
        query_id: QueryId,
        #[source]
        source: BackendFailure,
    },

    /// Every (query, backend) call failed, or there was nothing to evaluate
    #[error("No results produced: {failed} of {attempted} query/backend pairs failed")]
    EmptyResultSet { attempted: usize, failed: usize },

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Underlying cause of a failed search call
#[derive(Error, Debug)]
pub enum BackendFailure {
    /// Connection failure or timeout
    #[error("{}", describe_request_error(.0))]
    Request(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(u16),

    /// Response body was not JSON
    #[error("invalid response body: {0}")]
    Body(String),
}

/// reqwest's `Display` omits its causes, which is where "operation timed out" lives
fn describe_request_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let mut message = format!("{}: {}", kind, err);
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}

impl EvalError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
