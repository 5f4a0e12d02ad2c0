//! Fetches a bucket's blobs from a storage backend's read URL, through a
//! local cache, with bounded fan-out and per-blob retry.

use std::path::Path;
use std::sync::Arc;

use cfs_backend::{BackendError, Config, HttpClient, RetryPolicy};
use cfs_cache::BlobCache;
use cfs_crypto::{codec, ContentAttribute, Hash};
use cfs_formats::{Bucket, TagFile};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{DownloaderError, Result};

/// Fetches blobs named by a bucket manifest from wherever a publish put
/// them, routing through a local [`BlobCache`] so a repeated sync only pays
/// network cost for genuinely new content.
pub struct Downloader {
    base_url: Url,
    http: HttpClient,
    cache: BlobCache,
    retry: RetryPolicy,
    fanout: usize,
    default_attr: ContentAttribute,
    key: Vec<u8>,
    iv: [u8; 16],
}

impl Downloader {
    /// Build a downloader reading from `downloader_url` (typically
    /// [`cfs_backend::Storage::downloader_url`]'s return value), caching
    /// fetched blobs in `cache`. `config` supplies the compression/
    /// encryption settings a bucket manifest was published under — buckets
    /// are always stored with the default attribute, so decoding one
    /// requires the same key/IV a publish used.
    pub fn new(downloader_url: &str, cache: BlobCache, config: &Config) -> Result<Self> {
        let base_url = Url::parse(downloader_url).map_err(|e| DownloaderError::Fetch {
            hash: String::new(),
            source: BackendError::InvalidUrl(e),
        })?;
        Ok(Self {
            base_url,
            http: HttpClient::new().map_err(|e| DownloaderError::Fetch {
                hash: String::new(),
                source: e,
            })?,
            cache,
            retry: RetryPolicy::from_env(),
            fanout: config.fanout,
            default_attr: ContentAttribute::default_for(
                config.compress,
                config.encrypt_key.is_some(),
            ),
            key: config.encrypt_key.clone().unwrap_or_default(),
            iv: config.encrypt_iv.unwrap_or([0u8; 16]),
        })
    }

    /// Load and parse the bucket manifest found at `bucket_hash`. The
    /// fetched blob is decoded with this downloader's default attribute
    /// before parsing, since buckets are always stored encoded that way.
    pub async fn load_bucket(&self, bucket_hash: Hash) -> Result<Bucket> {
        let raw = self.fetch_raw(bucket_hash).await?;
        let decoded =
            codec::decode(&raw, &self.key, &self.iv, self.default_attr).map_err(|source| {
                DownloaderError::Decode {
                    hash: bucket_hash.to_hex(),
                    source,
                }
            })?;
        Ok(Bucket::parse(&decoded)?)
    }

    /// Resolve a CLI-facing `location` to a bucket hash. `location` is
    /// either hash-shaped (used directly) or a tag name (fetched from
    /// `<base>/tag/<name>`, parsed as the tag's JSON record, and resolved to
    /// the bucket hash it points at) — the discriminator is
    /// [`Hash::is_hash`], preserved from the historical `LoadBucket` as
    /// spec.md §9 requires.
    pub async fn resolve_location(&self, location: &str) -> Result<Hash> {
        if Hash::is_hash(location) {
            return Hash::from_hex(location).map_err(|source| DownloaderError::InvalidLocation {
                location: location.to_string(),
                reason: source.to_string(),
            });
        }

        let bytes = self.fetch_tag(location).await.map_err(|source| {
            DownloaderError::InvalidLocation {
                location: location.to_string(),
                reason: source.to_string(),
            }
        })?;
        let tag = TagFile::parse(&bytes).map_err(|source| DownloaderError::InvalidLocation {
            location: location.to_string(),
            reason: source.to_string(),
        })?;
        tag.bucket_hash()
            .map_err(|source| DownloaderError::InvalidLocation {
                location: location.to_string(),
                reason: source.to_string(),
            })
    }

    /// Load the bucket at `location` (hash or tag name).
    pub async fn load_bucket_at(&self, location: &str) -> Result<Bucket> {
        let hash = self.resolve_location(location).await?;
        self.load_bucket(hash).await
    }

    /// Fetch a tag record's raw bytes from `<base>/tag/<name>`.
    async fn fetch_tag(&self, name: &str) -> std::result::Result<Vec<u8>, BackendError> {
        if self.base_url.scheme() == "file" {
            let root = self
                .base_url
                .to_file_path()
                .map_err(|()| BackendError::InvalidUrl(url::ParseError::EmptyHost))?;
            let path = root.join("tag").join(name);
            return tokio::fs::read(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BackendError::NotFound(name.to_string())
                } else {
                    BackendError::Io(e)
                }
            });
        }

        let url = format!("{}/tag/{name}", self.base_url.as_str().trim_end_matches('/'));
        let resp = self.http.inner().get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(BackendError::HttpStatus {
                status,
                url: resp.url().to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// For each entry in `bucket`, report whether its blob is reachable on
    /// the backend — used by `ls --verify`. A cache hit counts as present
    /// without a network round trip.
    pub async fn exists_all(
        &self,
        bucket: &Bucket,
    ) -> std::collections::BTreeMap<String, bool> {
        let mut out = std::collections::BTreeMap::new();
        for (path, content) in &bucket.contents {
            let present = if self.cache.contains(content.hash).await {
                true
            } else {
                fetch_from_backend(&self.base_url, &self.http, content.hash)
                    .await
                    .is_ok()
            };
            out.insert(path.clone(), present);
        }
        out
    }

    /// Fetch one blob's raw (still-encoded) bytes, serving from the local
    /// cache when present and retrying transient backend failures up to
    /// [`RetryPolicy::max_attempts`] times.
    pub async fn fetch_raw(&self, hash: Hash) -> Result<Vec<u8>> {
        if let Some(bytes) = self.cache.get(hash).await? {
            return Ok(bytes);
        }

        let base_url = self.base_url.clone();
        let http = self.http.clone();
        let bytes = self
            .retry
            .execute(|| {
                let base_url = base_url.clone();
                let http = http.clone();
                async move { fetch_from_backend(&base_url, &http, hash).await }
            })
            .await
            .map_err(|source| DownloaderError::Fetch {
                hash: hash.to_hex(),
                source,
            })?;

        self.cache.put(hash, &bytes).await?;
        Ok(bytes)
    }

    /// Fetch many blobs concurrently, bounded by `fanout` in-flight
    /// requests. The first failure cancels every fetch that has not yet
    /// started; fetches already in flight are allowed to finish so partial
    /// cache warmth is not wasted, but their results are discarded.
    pub async fn fetch_all(&self, hashes: &[Hash]) -> Result<Vec<(Hash, Vec<u8>)>> {
        let semaphore = Arc::new(Semaphore::new(self.fanout.max(1)));
        let cancel = CancellationToken::new();
        let mut set = tokio::task::JoinSet::new();

        for &hash in hashes {
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let base_url = self.base_url.clone();
            let http = self.http.clone();
            let cache = self.cache.clone();
            let retry = self.retry.clone();

            set.spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit.expect("semaphore not closed"),
                    () = cancel.cancelled() => return Err(DownloaderError::Cancelled),
                };
                if cancel.is_cancelled() {
                    return Err(DownloaderError::Cancelled);
                }

                if let Some(bytes) = cache.get(hash).await? {
                    return Ok((hash, bytes));
                }

                let result = retry
                    .execute(|| {
                        let base_url = base_url.clone();
                        let http = http.clone();
                        async move { fetch_from_backend(&base_url, &http, hash).await }
                    })
                    .await;

                match result {
                    Ok(bytes) => {
                        cache.put(hash, &bytes).await?;
                        Ok((hash, bytes))
                    }
                    Err(source) => {
                        cancel.cancel();
                        Err(DownloaderError::Fetch {
                            hash: hash.to_hex(),
                            source,
                        })
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(hashes.len());
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(pair)) => results.push(pair),
                Ok(Err(DownloaderError::Cancelled)) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(DownloaderError::Fetch {
                            hash: String::new(),
                            source: BackendError::Task(e.to_string()),
                        });
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        Ok(results)
    }

    /// Fetch and decode every entry in `bucket`, writing each to
    /// `dest_dir/<path>`.
    pub async fn sync(&self, bucket: &Bucket, dest_dir: &Path) -> Result<usize> {
        let hashes: Vec<Hash> = bucket.contents.values().map(|c| c.hash).collect();
        let fetched = self.fetch_all(&hashes).await?;
        let by_hash: std::collections::HashMap<Hash, Vec<u8>> = fetched.into_iter().collect();

        let mut written = 0;
        for content in bucket.contents.values() {
            let Some(raw) = by_hash.get(&content.hash) else {
                continue;
            };
            let decoded = codec::decode(raw, &self.key, &self.iv, content.attr).map_err(
                |source| DownloaderError::Decode {
                    hash: content.hash.to_hex(),
                    source,
                },
            )?;

            let dest = dest_dir.join(&content.path);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| DownloaderError::Write {
                        path: content.path.clone(),
                        source,
                    })?;
            }
            tokio::fs::write(&dest, &decoded)
                .await
                .map_err(|source| DownloaderError::Write {
                    path: content.path.clone(),
                    source,
                })?;
            written += 1;
        }
        Ok(written)
    }

    /// Decode `raw` (as fetched by [`Downloader::fetch_raw`]) using this
    /// downloader's configured key/IV and `attr`.
    pub fn decode(&self, raw: &[u8], attr: ContentAttribute) -> Result<Vec<u8>> {
        codec::decode(raw, &self.key, &self.iv, attr).map_err(|source| DownloaderError::Decode {
            hash: String::new(),
            source,
        })
    }

    /// Which of `hashes` are already present in the local cache.
    pub async fn cached_mask(&self, hashes: &[Hash]) -> Vec<bool> {
        let mut mask = Vec::with_capacity(hashes.len());
        for &hash in hashes {
            mask.push(self.cache.contains(hash).await);
        }
        mask
    }
}

async fn fetch_from_backend(
    base_url: &Url,
    http: &HttpClient,
    hash: Hash,
) -> std::result::Result<Vec<u8>, BackendError> {
    if base_url.scheme() == "file" {
        let root = base_url
            .to_file_path()
            .map_err(|()| BackendError::InvalidUrl(url::ParseError::EmptyHost))?;
        return cfs_backend::file::read_blob(&root, hash).await.map(|b| b.to_vec());
    }

    let url = format!(
        "{}/data/{}",
        base_url.as_str().trim_end_matches('/'),
        hash.shard_path()
    );
    let resp = http.inner().get(&url).send().await?;
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(hash.to_hex()));
    }
    if !status.is_success() {
        return Err(BackendError::HttpStatus {
            status,
            url: resp.url().to_string(),
        });
    }
    Ok(resp.bytes().await?.to_vec())
}
