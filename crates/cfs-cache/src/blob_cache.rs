//! Flat, hash-keyed blob cache with atomic (temp-file-then-rename) writes.
//!
//! Entries are immutable once written: a given hash always maps to exactly
//! one encoded byte sequence, so there is no invalidation path. The cache is
//! shared across concurrent processes (multiple `cfs` invocations against
//! the same home directory), so a writer must never let a reader observe a
//! partially-written file.

use std::path::{Path, PathBuf};

use cfs_crypto::Hash;

use crate::error::CacheError;

/// A blob cache rooted at a single directory, keyed by the full hex hash.
///
/// Unlike the backend storage layout (`data/<aa>/<rest>`), the local cache
/// file name is the full 32-character hash with no sharding subdirectory.
#[derive(Debug, Clone)]
pub struct BlobCache {
    root: PathBuf,
}

impl BlobCache {
    /// Root the cache at `root`, which must already exist.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, hash: Hash) -> PathBuf {
        self.root.join(hash.to_hex())
    }

    /// Read a cached blob, if present.
    pub async fn get(&self, hash: Hash) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(hash);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Write `bytes` under `hash`, atomically.
    ///
    /// Writes to a sibling `.tmp` file, syncs it, then renames over the
    /// final path. A reader never sees a partial file: `rename` within one
    /// filesystem is atomic.
    pub async fn put(&self, hash: Hash, bytes: &[u8]) -> Result<(), CacheError> {
        let final_path = self.path_for(hash);
        let tmp_path = final_path.with_extension("tmp");

        write_atomic(&tmp_path, &final_path, bytes).await
    }

    /// `true` if `hash` is already present in the cache.
    pub async fn contains(&self, hash: Hash) -> bool {
        tokio::fs::metadata(self.path_for(hash)).await.is_ok()
    }
}

async fn write_atomic(tmp_path: &Path, final_path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let file = tokio::fs::File::create(tmp_path)
        .await
        .map_err(|source| CacheError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
    {
        use tokio::io::AsyncWriteExt;
        let mut file = file;
        file.write_all(bytes).await.map_err(|source| CacheError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
        file.sync_all().await.map_err(|source| CacheError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
    }

    tokio::fs::rename(tmp_path, final_path)
        .await
        .map_err(|source| CacheError::Io {
            path: final_path.display().to_string(),
            source,
        })
}
