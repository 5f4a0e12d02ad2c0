//! Fetch-side downloader: loads a bucket manifest and syncs its blobs
//! through a local cache, with bounded fan-out and per-blob retry.

#![warn(missing_docs)]

pub mod downloader;
pub mod error;

pub use downloader::Downloader;
pub use error::{DownloaderError, Result};
