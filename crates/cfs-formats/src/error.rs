//! Error types for manifest and archive parsing

use thiserror::Error;

/// Errors that can occur while parsing or building `cfs` formats
#[derive(Debug, Error)]
pub enum FormatError {
    /// A bucket manifest line had fewer than the required three columns
    #[error("malformed bucket line (expected at least 3 columns): {0:?}")]
    MalformedLine(String),

    /// A numeric or timestamp column failed to parse
    #[error("invalid field {field} in bucket line: {source}")]
    InvalidField {
        /// Name of the offending column
        field: &'static str,
        /// Underlying parse error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A hash column was not 32 lowercase hex characters
    #[error("invalid hash in bucket line: {0}")]
    InvalidHash(#[from] cfs_crypto::CryptoError),

    /// Pack file magic bytes did not match `"TP"`
    #[error("invalid pack file magic")]
    InvalidMagic,

    /// Pack file version byte was not a version this crate understands
    #[error("unsupported pack file version: {0}")]
    UnsupportedVersion(u8),

    /// A path inside a pack file entry was not valid UTF-8
    #[error("non-UTF-8 path in pack entry")]
    InvalidPath,

    /// binrw failed to read or write a pack file
    #[error("pack file I/O error: {0}")]
    Binrw(#[from] binrw::Error),

    /// I/O error reading a source file or tag record
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error for a tag record
    #[error("tag record JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Timestamp did not parse as RFC3339
    #[error("invalid RFC3339 timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),
}
