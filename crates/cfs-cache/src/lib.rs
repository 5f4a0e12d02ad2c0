//! Home-directory layout and the local, immutable blob cache.
//!
//! `cfs` keeps two on-disk caches under `~/.cfs/`:
//! - `cache/` — bucket manifests, keyed by a caller-chosen file name.
//! - `datacache/` — encoded blobs, keyed by their content hash. Entries
//!   never change once written, so there is no invalidation; the only
//!   requirement is that concurrent writers never observe a partial file.

#![warn(missing_docs)]

pub mod blob_cache;
pub mod error;
pub mod home;

pub use blob_cache::BlobCache;
pub use error::CacheError;
pub use home::{cache_dir, data_cache_dir, home_dir};
