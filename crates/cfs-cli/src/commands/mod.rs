//! One handler per `cfs` subcommand.

pub mod cat;
pub mod config_cmd;
pub mod ls;
pub mod merge;
pub mod pack;
pub mod pack_bucket;
pub mod patch;
pub mod sync;
pub mod unpack;
pub mod upload;

use std::sync::Arc;

use cfs_backend::Storage;
use cfs_cache::BlobCache;
use cfs_downloader::Downloader;

use crate::config::CfsConfig;
use crate::error::Result;

/// Build the storage backend named by the resolved `cabinet` URL.
pub fn build_storage(config: &CfsConfig) -> Result<Arc<dyn Storage>> {
    Ok(Arc::from(cfs_backend::storage_from_url(
        &config.cabinet,
        admin_user(config),
        admin_pass(config),
    )?))
}

/// The URL a downloader reads blobs from: `config.url` if set, otherwise
/// derived from the cabinet backend.
pub fn downloader_url(config: &CfsConfig) -> Result<String> {
    if !config.url.is_empty() {
        return Ok(config.url.clone());
    }
    let storage = cfs_backend::storage_from_url(&config.cabinet, admin_user(config), admin_pass(config))?;
    Ok(storage.downloader_url())
}

fn admin_user(config: &CfsConfig) -> Option<&str> {
    (!config.admin_user.is_empty()).then_some(config.admin_user.as_str())
}

fn admin_pass(config: &CfsConfig) -> Option<&str> {
    (!config.admin_pass.is_empty()).then_some(config.admin_pass.as_str())
}

/// Build a downloader against the resolved cabinet/url, caching blobs under
/// `~/.cfs/datacache`. The downloader carries the same compress/encrypt
/// settings as the backend, since a bucket manifest is always stored with
/// the default attribute.
pub fn build_downloader(config: &CfsConfig) -> Result<Downloader> {
    let url = downloader_url(config)?;
    let cache = BlobCache::new(cfs_cache::data_cache_dir()?);
    Ok(Downloader::new(&url, cache, &config.backend_config())?)
}
