//! `cfs pack-bucket` — bridge bucket-world and pack-world: fetch every
//! entry in a bucket and write it out as a pack file.

use std::path::Path;

use cfs_formats::PackFile;

use crate::commands::build_downloader;
use crate::config::CfsConfig;
use crate::error::Result;
use crate::filter;

/// Load the bucket at `location`, fetch and decode every entry, and write
/// the original (pre-encode) bytes out as a pack file at `pack_file`.
pub async fn run(
    config: &CfsConfig,
    location: &str,
    pack_file: &Path,
    filter_cmd: Option<&str>,
) -> Result<()> {
    let downloader = build_downloader(config)?;
    let mut bucket = downloader.load_bucket_at(location).await?;

    if let Some(cmd) = filter_cmd {
        bucket = filter::filter_bucket(cmd, &bucket).await?;
    }

    let hashes: Vec<_> = bucket.contents.values().map(|c| c.hash).collect();
    downloader.fetch_all(&hashes).await?;

    let mut files = Vec::with_capacity(bucket.contents.len());
    for content in bucket.contents.values() {
        let raw = downloader.fetch_raw(content.hash).await?;
        let decoded = downloader.decode(&raw, content.attr)?;
        files.push((content.path.clone(), decoded));
    }

    let bytes = PackFile::build(files)?;
    std::fs::write(pack_file, bytes)?;
    Ok(())
}
