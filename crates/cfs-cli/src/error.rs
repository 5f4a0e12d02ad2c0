//! Error type for the `cfs` CLI layer.
//!
//! Every lower crate has its own `thiserror` enum; this one wraps them so a
//! command handler can propagate with `?` all the way up to `main`, which
//! converts the final error into an `anyhow::Error` for display (see
//! `SPEC_FULL.md` §7).

use thiserror::Error;

/// Errors surfaced by the `cfs` CLI's command handlers.
#[derive(Debug, Error)]
pub enum CliError {
    /// `.cfsenv` could not be read for a reason other than "missing".
    #[error("reading config {path}: {source}")]
    ReadConfig {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// `.cfsenv` was present but not valid JSON in the expected shape.
    #[error("parsing config: {source}")]
    ParseConfig {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The location argument passed to a command naming a bucket (`sync`,
    /// `merge`, `cat`, `ls`, `pack-bucket`) was neither hash-shaped nor a
    /// resolvable tag.
    #[error("'{0}' is not a hash or a known tag")]
    InvalidLocation(String),

    /// A requested path was not present in the loaded bucket.
    #[error("file '{0}' not found in bucket")]
    FileNotFound(String),

    /// A `--filter-cmd` subprocess exited non-zero or produced no output.
    #[error("filter command '{cmd}' failed: {reason}")]
    FilterFailed {
        /// The configured filter command.
        cmd: String,
        /// What went wrong (non-zero exit, no stdout, spawn failure).
        reason: String,
    },

    /// The local blob/manifest cache directory layout could not be set up.
    #[error("cache error: {0}")]
    Cache(#[from] cfs_cache::CacheError),

    /// A format (bucket/pack/tag) failed to parse or serialize.
    #[error("format error: {0}")]
    Format(#[from] cfs_formats::FormatError),

    /// A storage backend operation failed.
    #[error("backend error: {0}")]
    Backend(#[from] cfs_backend::BackendError),

    /// The publish-side client failed.
    #[error("client error: {0}")]
    Client(#[from] cfs_client::ClientError),

    /// The downloader failed.
    #[error("downloader error: {0}")]
    Downloader(#[from] cfs_downloader::DownloaderError),

    /// A content hash failed to parse.
    #[error("hash error: {0}")]
    Hash(#[from] cfs_crypto::CryptoError),

    /// Local filesystem I/O outside the config/cache paths above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for CLI command results.
pub type Result<T> = std::result::Result<T, CliError>;
