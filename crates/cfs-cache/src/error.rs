//! Error types for cache operations

use thiserror::Error;

/// Errors that can occur while reading or writing the local cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error performing a cache read/write
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// Path being operated on
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Could not determine the user's home directory
    #[error("could not determine home directory")]
    NoHomeDir,
}
