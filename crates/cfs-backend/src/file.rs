//! `file://` backend: blobs laid out as `<root>/data/<shard>` and tags as
//! `<root>/tag/<name>`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use cfs_crypto::Hash;

use crate::error::{BackendError, Result};
use crate::storage::Storage;

/// Local-disk storage, used for tests and single-machine deployments.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Root a backend at `root`; the `data/` and `tag/` subdirectories are
    /// created lazily on first write.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn blob_path(&self, hash: Hash) -> PathBuf {
        self.root.join("data").join(hash.shard_path())
    }

    fn tag_path(&self, name: &str) -> PathBuf {
        self.root.join("tag").join(name)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[async_trait]
impl Storage for FileStorage {
    fn downloader_url(&self) -> String {
        format!("file://{}", self.root.display())
    }

    async fn exists(&self, hash: Hash) -> Result<bool> {
        Ok(tokio::fs::metadata(self.blob_path(hash)).await.is_ok())
    }

    async fn upload(
        &self,
        _filename: &str,
        hash: Hash,
        bytes: Bytes,
        overwrite: bool,
    ) -> Result<()> {
        if !overwrite && self.exists(hash).await? {
            return Ok(());
        }
        write_file(&self.blob_path(hash), &bytes).await
    }

    async fn upload_tag(&self, name: &str, bytes: Bytes) -> Result<()> {
        write_file(&self.tag_path(name), &bytes).await
    }
}

/// Read a blob back from a `file://` downloader URL, used by the downloader
/// so a local backend needs no HTTP round trip.
pub async fn read_blob(root: &Path, hash: Hash) -> Result<Bytes> {
    let path = root.join("data").join(hash.shard_path());
    tokio::fs::read(&path)
        .await
        .map(Bytes::from)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::NotFound(hash.to_hex())
            } else {
                BackendError::Io(e)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_exists_then_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf());
        let hash = Hash::from_data(b"payload");

        assert!(!storage.exists(hash).await.expect("exists"));
        storage
            .upload("a/b.txt", hash, Bytes::from_static(b"payload"), true)
            .await
            .expect("upload");
        assert!(storage.exists(hash).await.expect("exists"));

        let bytes = read_blob(dir.path(), hash).await.expect("read");
        assert_eq!(bytes, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn upload_skips_when_not_overwriting_existing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf());
        let hash = Hash::from_data(b"v1");

        storage
            .upload("f", hash, Bytes::from_static(b"v1"), true)
            .await
            .expect("upload");
        storage
            .upload("f", hash, Bytes::from_static(b"v2-should-be-ignored"), false)
            .await
            .expect("upload (no-op)");

        let bytes = read_blob(dir.path(), hash).await.expect("read");
        assert_eq!(bytes, Bytes::from_static(b"v1"));
    }

    #[tokio::test]
    async fn upload_tag_writes_under_tag_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf());
        storage
            .upload_tag("live", Bytes::from_static(b"{}"))
            .await
            .expect("upload_tag");
        let bytes = tokio::fs::read(dir.path().join("tag").join("live"))
            .await
            .expect("read");
        assert_eq!(bytes, b"{}");
    }

    #[tokio::test]
    async fn missing_blob_reads_as_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_blob(dir.path(), Hash::from_data(b"nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }
}
