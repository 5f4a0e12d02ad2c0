//! The publish-side client: walks a directory, encodes each new or changed
//! file, and uploads the result through a bounded worker pool.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use cfs_backend::{Config, Storage};
use cfs_crypto::{codec, Hash};
use cfs_formats::{Bucket, Content, TagFile};

use crate::error::{ClientError, Result};
use crate::walk::{walk_with_options, WalkOptions};

/// Outcome of a [`Client::publish_dir`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Files encoded and uploaded because they were new or changed.
    pub uploaded: usize,
    /// Files left alone because their content hash was already in the bucket.
    pub skipped: usize,
    /// Uploads that failed. The first failure's error is returned alongside
    /// this count; the remaining jobs still run to completion rather than
    /// being cancelled.
    pub failed: usize,
}

struct UploadJob {
    rel_path: String,
    bytes: Vec<u8>,
    mtime: DateTime<Utc>,
}

/// Publishes a local directory tree to a [`Storage`] backend.
pub struct Client {
    storage: Arc<dyn Storage>,
    config: Config,
}

impl Client {
    /// Build a client against `storage`, using `config` for compression,
    /// encryption, and concurrency settings.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        Self { storage, config }
    }

    /// Walk `dir` and publish every file to `bucket`.
    ///
    /// A file is skipped (not re-encoded or re-uploaded) when `bucket`
    /// already has an entry for its path whose `orig_hash`/`orig_size` match
    /// the current file, unless `force` is set. Every visited path is marked
    /// `touched`; the caller decides whether to call
    /// [`cfs_formats::Bucket::remove_untouched`] afterward (a `sync`
    /// publish drops stale entries, a `merge` publish keeps them).
    pub async fn publish_dir(
        &self,
        dir: &Path,
        bucket: &mut Bucket,
        force: bool,
    ) -> Result<UploadSummary> {
        self.publish_dir_with_options(dir, bucket, force, WalkOptions::default())
            .await
    }

    /// As [`Client::publish_dir`], but with explicit walk options
    /// (`recursive`/`flatten`) instead of the defaults.
    pub async fn publish_dir_with_options(
        &self,
        dir: &Path,
        bucket: &mut Bucket,
        force: bool,
        walk_options: WalkOptions,
    ) -> Result<UploadSummary> {
        let files = walk_with_options(dir, walk_options)?;
        let mut summary = UploadSummary::default();
        let mut jobs = Vec::new();

        for (rel_path, abs_path) in files {
            let bytes = tokio::fs::read(&abs_path)
                .await
                .map_err(|source| ClientError::Read {
                    path: rel_path.clone(),
                    source,
                })?;
            let mtime = file_mtime(&abs_path).await?;
            let orig_hash = Hash::from_data(&bytes);
            let orig_size = bytes.len() as u64;

            if !force {
                if let Some(existing) = bucket.contents.get_mut(&rel_path) {
                    if existing.orig_hash == orig_hash && existing.orig_size == orig_size {
                        existing.touched = true;
                        summary.skipped += 1;
                        continue;
                    }
                }
            }

            jobs.push(UploadJob {
                rel_path,
                bytes,
                mtime,
            });
        }

        let (uploaded, results) = self.run_uploads(jobs).await?;

        for content in uploaded {
            bucket.contents.insert(content.path.clone(), content);
            summary.uploaded += 1;
        }
        summary.failed = results.failed;

        if let Some(first_error) = results.first_error {
            tracing::warn!(
                failed = results.failed,
                "publish finished with {} failed upload(s), first: {}",
                results.failed,
                first_error
            );
            return Err(first_error);
        }

        Ok(summary)
    }

    /// Serialize `bucket`, encode it with the default attribute, upload it
    /// as one more blob, and — if `bucket.tag` is set — publish a tag
    /// record pointing at the resulting hash. Returns the bucket's own
    /// hash, which is also recorded on `bucket.hash`.
    pub async fn finish(&self, bucket: &mut Bucket) -> Result<Hash> {
        let dump = bucket.dump();
        let default_attr = cfs_crypto::ContentAttribute::default_for(
            self.config.compress,
            self.config.encrypt_key.is_some(),
        );
        let key = self.config.encrypt_key.clone().unwrap_or_default();
        let iv = self.config.encrypt_iv.unwrap_or([0u8; 16]);

        let (encoded, _changed) =
            codec::encode(&dump, &key, &iv, default_attr).map_err(|source| ClientError::Encode {
                path: "<bucket manifest>".to_string(),
                source,
            })?;
        let hash = Hash::from_data(&encoded);

        self.storage
            .upload("bucket", hash, Bytes::from(encoded), false)
            .await
            .map_err(|source| ClientError::Upload {
                path: "<bucket manifest>".to_string(),
                source,
            })?;
        bucket.hash = Some(hash);

        if let Some(tag) = bucket.tag.clone().filter(|t| !t.is_empty()) {
            let tag_file = TagFile::new(
                tag.clone(),
                Utc::now(),
                self.config.encrypt_key.as_deref(),
                self.config.encrypt_iv.as_ref(),
                default_attr,
                hash,
            );
            let tag_bytes = tag_file.dump()?;
            self.storage
                .upload_tag(&tag, Bytes::from(tag_bytes))
                .await
                .map_err(|source| ClientError::Upload {
                    path: format!("<tag {tag}>"),
                    source,
                })?;
        }

        Ok(hash)
    }

    async fn run_uploads(&self, jobs: Vec<UploadJob>) -> Result<(Vec<Content>, UploadResults)> {
        let worker_count = self.config.upload_workers.max(1).min(jobs.len().max(1));
        let (job_tx, job_rx) = mpsc::channel::<UploadJob>(jobs.len().max(1));
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));

        for job in jobs {
            job_tx.send(job).await.ok();
        }
        drop(job_tx);

        let mut set = JoinSet::new();
        for _ in 0..worker_count {
            let job_rx = Arc::clone(&job_rx);
            let storage = Arc::clone(&self.storage);
            let config = self.config.clone();
            set.spawn(async move { Self::worker_loop(job_rx, storage, config).await });
        }

        let mut uploaded = Vec::new();
        let mut results = UploadResults::default();
        while let Some(joined) = set.join_next().await {
            let worker_results = joined.map_err(|e| ClientError::Upload {
                path: "<worker task>".to_string(),
                source: cfs_backend::BackendError::Task(e.to_string()),
            })?;
            for outcome in worker_results {
                match outcome {
                    Ok(content) => uploaded.push(content),
                    Err(e) => {
                        results.failed += 1;
                        if results.first_error.is_none() {
                            results.first_error = Some(e);
                        }
                    }
                }
            }
        }

        Ok((uploaded, results))
    }

    async fn worker_loop(
        job_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<UploadJob>>>,
        storage: Arc<dyn Storage>,
        config: Config,
    ) -> Vec<Result<Content>> {
        let mut outcomes = Vec::new();
        loop {
            let job = {
                let mut rx = job_rx.lock().await;
                rx.recv().await
            };
            let Some(job) = job else { break };
            outcomes.push(Self::upload_one(&storage, &config, job).await);
        }
        outcomes
    }

    async fn upload_one(storage: &Arc<dyn Storage>, config: &Config, job: UploadJob) -> Result<Content> {
        let UploadJob {
            rel_path,
            bytes,
            mtime,
        } = job;
        let orig_hash = Hash::from_data(&bytes);
        let orig_size = bytes.len() as u64;

        let default_attr =
            cfs_crypto::ContentAttribute::default_for(config.compress, config.encrypt_key.is_some());
        let attr = Bucket::attribute_for(&rel_path, default_attr);
        let key = config.encrypt_key.clone().unwrap_or_default();
        let iv = config.encrypt_iv.unwrap_or([0u8; 16]);

        let (encoded, changed) =
            codec::encode(&bytes, &key, &iv, attr).map_err(|source| ClientError::Encode {
                path: rel_path.clone(),
                source,
            })?;
        let hash = if changed {
            Hash::from_data(&encoded)
        } else {
            orig_hash
        };

        storage
            .upload(&rel_path, hash, Bytes::from(encoded.clone()), false)
            .await
            .map_err(|source| ClientError::Upload {
                path: rel_path.clone(),
                source,
            })?;

        Ok(Content {
            path: rel_path,
            hash,
            orig_hash,
            size: encoded.len() as u64,
            orig_size,
            time: mtime,
            attr,
            touched: true,
        })
    }
}

/// The source file's last-modified timestamp, per §3's definition of
/// `Content.time` — the wall clock at publish time is not this.
async fn file_mtime(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| ClientError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let modified = metadata.modified().map_err(|source| ClientError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(DateTime::<Utc>::from(modified))
}

#[derive(Default)]
struct UploadResults {
    failed: usize,
    first_error: Option<ClientError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfs_backend::FileStorage;

    async fn storage(dir: &Path) -> Arc<dyn Storage> {
        Arc::new(FileStorage::new(dir.to_path_buf()))
    }

    #[tokio::test]
    async fn publishes_new_files_and_marks_them_touched() {
        let src = tempfile::tempdir().expect("tempdir");
        let backend_dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(src.path().join("a.txt"), b"hello").expect("write");
        std::fs::write(src.path().join("b.txt"), b"world").expect("write");

        let client = Client::new(storage(backend_dir.path()).await, Config::default());
        let mut bucket = Bucket::new();
        let summary = client
            .publish_dir(src.path(), &mut bucket, false)
            .await
            .expect("publish");

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(bucket.contents.len(), 2);
        assert!(bucket.contents["a.txt"].touched);
    }

    #[tokio::test]
    async fn unchanged_files_are_skipped_without_force() {
        let src = tempfile::tempdir().expect("tempdir");
        let backend_dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(src.path().join("a.txt"), b"hello").expect("write");

        let client = Client::new(storage(backend_dir.path()).await, Config::default());
        let mut bucket = Bucket::new();
        client
            .publish_dir(src.path(), &mut bucket, false)
            .await
            .expect("first publish");

        for content in bucket.contents.values_mut() {
            content.touched = false;
        }

        let summary = client
            .publish_dir(src.path(), &mut bucket, false)
            .await
            .expect("second publish");
        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.skipped, 1);
        assert!(bucket.contents["a.txt"].touched);
    }

    #[tokio::test]
    async fn force_reuploads_even_unchanged_files() {
        let src = tempfile::tempdir().expect("tempdir");
        let backend_dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(src.path().join("a.txt"), b"hello").expect("write");

        let client = Client::new(storage(backend_dir.path()).await, Config::default());
        let mut bucket = Bucket::new();
        client
            .publish_dir(src.path(), &mut bucket, false)
            .await
            .expect("first publish");

        let summary = client
            .publish_dir(src.path(), &mut bucket, true)
            .await
            .expect("forced publish");
        assert_eq!(summary.uploaded, 1);
    }

    #[tokio::test]
    async fn finish_uploads_manifest_and_records_bucket_hash() {
        let src = tempfile::tempdir().expect("tempdir");
        let backend_dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(src.path().join("a.txt"), b"hello").expect("write");

        let client = Client::new(storage(backend_dir.path()).await, Config::default());
        let mut bucket = Bucket::new();
        client
            .publish_dir(src.path(), &mut bucket, false)
            .await
            .expect("publish");

        let hash = client.finish(&mut bucket).await.expect("finish");
        assert_eq!(bucket.hash, Some(hash));
    }

    #[tokio::test]
    async fn finish_publishes_a_tag_when_bucket_has_one() {
        let src = tempfile::tempdir().expect("tempdir");
        let backend_dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(src.path().join("a.txt"), b"hello").expect("write");

        let client = Client::new(storage(backend_dir.path()).await, Config::default());
        let mut bucket = Bucket::new();
        bucket.tag = Some("live".to_string());
        client
            .publish_dir(src.path(), &mut bucket, false)
            .await
            .expect("publish");
        client.finish(&mut bucket).await.expect("finish");

        assert!(backend_dir.path().join("tag").join("live").exists());
    }
}
