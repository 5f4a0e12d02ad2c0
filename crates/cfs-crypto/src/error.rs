//! Error types for hashing and codec operations

use thiserror::Error;

/// Errors that can occur during hashing or the encode/decode pipeline
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key size for the selected AES variant
    #[error("invalid key size: {0} bytes (expected 16, 24, or 32)")]
    InvalidKeySize(usize),

    /// IV is not exactly one block (16 bytes)
    #[error("invalid IV size: expected 16 bytes, got {0}")]
    InvalidIvSize(usize),

    /// Decompression failed
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// Compression failed
    #[error("compression failed: {0}")]
    Compress(String),

    /// A string that was expected to be a 32-character lowercase hex hash was not
    #[error("not a valid hash: {0}")]
    InvalidHash(String),
}
