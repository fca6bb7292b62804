//! Structured error types for the collection pipeline.
//!
//! Timeout-class transport failures get their own variant because the retry
//! policy branches on them: timeouts are retried with backoff, everything
//! else surfaces immediately.

use thiserror::Error;

/// Errors produced while fetching, parsing, merging, or persisting tables.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("http status {status} from {url}")]
    Http { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("merge error: {0}")]
    Merge(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectError {
    /// Timeout-class failures are the only retryable kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CollectError::Timeout(_))
    }

    /// Classify a transport error from the HTTP client.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollectError::Timeout(err.to_string())
        } else {
            CollectError::Network(err.to_string())
        }
    }
}
