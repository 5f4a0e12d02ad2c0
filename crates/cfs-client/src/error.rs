//! Error types for the publish-side client.

use thiserror::Error;

/// Errors that can occur while publishing a directory to a bucket.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Reading a source file off disk failed.
    #[error("reading {path}: {source}")]
    Read {
        /// The file that failed to read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The encode step (compress/encrypt) failed.
    #[error("encoding {path}: {source}")]
    Encode {
        /// The file whose bytes failed to encode.
        path: String,
        /// Underlying codec error.
        source: cfs_crypto::CryptoError,
    },

    /// A backend upload failed.
    #[error("uploading {path}: {source}")]
    Upload {
        /// The file that failed to upload.
        path: String,
        /// Underlying backend error.
        source: cfs_backend::BackendError,
    },

    /// Walking the source directory failed.
    #[error("walking source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// A source path was not valid UTF-8.
    #[error("non-UTF-8 path: {0}")]
    InvalidPath(String),

    /// Serializing the bucket manifest or a tag record failed.
    #[error("format error: {0}")]
    Format(#[from] cfs_formats::FormatError),
}

/// Convenience alias for client results.
pub type Result<T> = std::result::Result<T, ClientError>;
