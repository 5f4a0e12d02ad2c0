//! `~/.cfs/` layout: `cache/` for bucket manifests, `datacache/` for blobs.

use std::path::PathBuf;

use crate::error::CacheError;

/// `~/.cfs`, creating it if missing.
pub fn home_dir() -> Result<PathBuf, CacheError> {
    let root = dirs::home_dir().ok_or(CacheError::NoHomeDir)?.join(".cfs");
    ensure_dir(&root)?;
    Ok(root)
}

/// `~/.cfs/cache` — local bucket-manifest cache, creating it if missing.
pub fn cache_dir() -> Result<PathBuf, CacheError> {
    let dir = home_dir()?.join("cache");
    ensure_dir(&dir)?;
    Ok(dir)
}

/// `~/.cfs/datacache` — immutable blob cache, creating it if missing.
pub fn data_cache_dir() -> Result<PathBuf, CacheError> {
    let dir = home_dir()?.join("datacache");
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(path: &std::path::Path) -> Result<(), CacheError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|source| CacheError::Io {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}
