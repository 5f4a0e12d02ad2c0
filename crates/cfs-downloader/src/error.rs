//! Error types for the fetch-side downloader.

use thiserror::Error;

/// Errors that can occur while loading a bucket or syncing its blobs.
#[derive(Debug, Error)]
pub enum DownloaderError {
    /// A blob fetch exhausted its retries.
    #[error("fetching {hash}: {source}")]
    Fetch {
        /// Hex hash of the blob that failed.
        hash: String,
        /// Underlying transport error.
        source: cfs_backend::BackendError,
    },

    /// Decoding a fetched blob (decrypt/inflate) failed.
    #[error("decoding {hash}: {source}")]
    Decode {
        /// Hex hash of the blob that failed to decode.
        hash: String,
        /// Underlying codec error.
        source: cfs_crypto::CryptoError,
    },

    /// Writing a decoded blob to the destination directory failed.
    #[error("writing {path}: {source}")]
    Write {
        /// Destination-relative path that failed to write.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The local blob cache failed.
    #[error("cache error: {0}")]
    Cache(#[from] cfs_cache::CacheError),

    /// The bucket manifest failed to parse.
    #[error("bucket manifest error: {0}")]
    Format(#[from] cfs_formats::FormatError),

    /// A sync was aborted because a sibling fetch in the same batch failed
    /// first.
    #[error("cancelled after a sibling fetch failed")]
    Cancelled,

    /// A `load_bucket_at` location was neither hash-shaped nor a resolvable
    /// tag (the tag fetch itself failed, or its body was not hash-shaped).
    #[error("'{location}' is not a hash or a known tag: {reason}")]
    InvalidLocation {
        /// The location string that could not be resolved.
        location: String,
        /// What went wrong.
        reason: String,
    },
}

/// Convenience alias for downloader results.
pub type Result<T> = std::result::Result<T, DownloaderError>;
