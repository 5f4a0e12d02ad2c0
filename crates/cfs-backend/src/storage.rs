//! The [`Storage`] trait every backend implements, and the immutable
//! [`Config`] passed into a client or downloader at construction.

use async_trait::async_trait;
use bytes::Bytes;
use cfs_crypto::Hash;

use crate::error::Result;

/// Default bound on concurrent in-flight blob fetches (see
/// `Downloader::fetch_all`).
pub const DEFAULT_FANOUT: usize = 8;

/// Default bound on concurrent in-flight blob uploads.
pub const DEFAULT_UPLOAD_WORKERS: usize = 32;

/// A destination a bucket's blobs, manifest, and tag can be published to or
/// fetched from.
///
/// Every method is keyed by content hash rather than by local path: the
/// backend never needs to know anything about the original file, only the
/// bytes that were produced by [`cfs_crypto::codec::encode`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// The URL a downloader should use to read blobs back. For
    /// most backends this is the same base URL the storage was built from;
    /// `cfs://` strips its embedded credentials since downloads are
    /// unauthenticated reads.
    fn downloader_url(&self) -> String;

    /// `true` if `hash` is already present, used to skip redundant uploads
    /// when `overwrite` is false.
    async fn exists(&self, hash: Hash) -> Result<bool>;

    /// Store `bytes` under `hash`. `filename` is the original bucket-relative
    /// path, kept for backends that log or index by name; content-addressed
    /// backends ignore it for the storage key itself. Skips the write if
    /// `overwrite` is false and `hash` already exists.
    async fn upload(&self, filename: &str, hash: Hash, bytes: Bytes, overwrite: bool)
    -> Result<()>;

    /// Publish a tag record's raw JSON bytes under `name`.
    async fn upload_tag(&self, name: &str, bytes: Bytes) -> Result<()>;
}

/// Immutable settings shared by a publish-side client or a downloader for
/// the lifetime of one run.
///
/// The original implementation kept this as a mutable global; `cfs` instead
/// threads one `Config` value through construction so that two clients in
/// the same process (e.g. concurrent tests) never observe each other's
/// settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default content attribute applied to new files (subject to the
    /// forced-raw-extension override in `cfs_formats::Bucket::attribute_for`).
    pub compress: bool,
    /// AES key for encrypted buckets, if any.
    pub encrypt_key: Option<Vec<u8>>,
    /// AES IV for encrypted buckets, if any.
    pub encrypt_iv: Option<[u8; 16]>,
    /// Bound on concurrent blob fetches during a sync.
    pub fanout: usize,
    /// Bound on concurrent blob uploads during a publish.
    pub upload_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compress: true,
            encrypt_key: None,
            encrypt_iv: None,
            fanout: DEFAULT_FANOUT,
            upload_workers: DEFAULT_UPLOAD_WORKERS,
        }
    }
}
