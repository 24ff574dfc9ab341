//! # Client Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Unreachable ── no backend answered (connect refused, timeout, DNS)     │
//! │                 reads fall back to the offline cache                    │
//! │  Http        ── backend answered with a non-2xx status                  │
//! │                 carries the server's `error` message and `code`         │
//! │  Decode      ── backend answered 2xx with a body we cannot parse        │
//! │  Cache       ── offline cache file could not be read or written         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No backend could be reached.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// The backend rejected the request.
    #[error("{message} (HTTP {status})")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Offline cache I/O or format failure.
    #[error("Offline cache error: {0}")]
    Cache(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if err.is_builder() {
            ClientError::InvalidUrl(err.to_string())
        } else {
            ClientError::Unreachable(err.to_string())
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Cache(err.to_string())
    }
}

impl ClientError {
    /// True when the backend could not be reached at all.
    pub fn is_offline(&self) -> bool {
        matches!(self, ClientError::Unreachable(_))
    }

    /// HTTP status for server rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Machine-readable code from the server's error body, e.g.
    /// `INSUFFICIENT_STOCK`.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
