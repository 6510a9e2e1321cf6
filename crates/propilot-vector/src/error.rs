//! Vector store error types.

use thiserror::Error;

/// Errors that can occur while opening or talking to a vector store.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Connection refused, DNS failure, reset, ...
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded its timeout
    #[error("Request timed out")]
    Timeout,

    /// HTTP 429 from the service
    #[error("Rate limit exceeded")]
    RateLimited,

    /// HTTP 5xx from the service
    #[error("Upstream error (HTTP {status}): {body}")]
    Upstream { status: u16, body: String },

    /// HTTP 401/403: missing or wrong API key
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other 4xx: bad request, invalid dimension, quota, ...
    #[error("Request rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client could not be constructed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// RocksDB error
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VectorError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => VectorError::Unauthorized(body),
            429 => VectorError::RateLimited,
            500..=599 => VectorError::Upstream { status, body },
            _ => VectorError::Rejected { status, body },
        }
    }

    /// Transient failures worth another attempt.
    ///
    /// Credentials, validation and parse failures are permanent and are
    /// surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VectorError::Transport(_)
                | VectorError::Timeout
                | VectorError::RateLimited
                | VectorError::Upstream { .. }
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            VectorError::Upstream { status, .. } | VectorError::Rejected { status, .. } => {
                Some(*status)
            }
            VectorError::RateLimited => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VectorError::Timeout
        } else if err.is_decode() {
            VectorError::Parse(err.to_string())
        } else {
            VectorError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Parse(err.to_string())
    }
}
