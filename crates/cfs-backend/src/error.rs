//! Error types for storage backend operations

use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`crate::Storage`] implementation or the transport
/// layer underneath it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Local filesystem I/O failure (the `file://` backend).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (connect, TLS, timeout, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An object store backend (`gs://`/`s3://`) failed.
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// The storage URL's scheme is not one of `file`/`http`/`https`/`cfs`/`gs`/`s3`.
    #[error("unsupported storage URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The storage URL failed to parse.
    #[error("invalid storage URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A `cfs://` admin endpoint rejected the request's Basic auth credentials.
    #[error("authentication failed against {0}")]
    AuthFailed(String),

    /// An upload or existence check got a non-2xx response outside the
    /// retryable set.
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus {
        /// The response status code.
        status: reqwest::StatusCode,
        /// The request URL that produced it.
        url: String,
    },

    /// The backend was asked for a hash it does not have.
    #[error("not found: {0}")]
    NotFound(String),

    /// A server indicated the client should slow down.
    #[error("rate limited")]
    RateLimited {
        /// Duration from the HTTP `Retry-After` header, if present.
        retry_after: Option<Duration>,
    },

    /// A background task (e.g. an upload/download worker) panicked or was
    /// cancelled before it could report its own result.
    #[error("background task failed: {0}")]
    Task(String),
}

impl BackendError {
    /// `true` if a retry is likely to succeed: connect/timeout failures,
    /// 5xx responses, and explicit rate limiting.
    #[must_use]
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            Self::ObjectStore(object_store::Error::Generic { .. }) => true,
            _ => false,
        }
    }
}

/// Convenience alias for backend results.
pub type Result<T> = std::result::Result<T, BackendError>;
