//! `cfs cat` — fetch and decode one file from a bucket, writing it to stdout.

use std::io::Write;

use crate::commands::build_downloader;
use crate::config::CfsConfig;
use crate::error::{CliError, Result};

/// Load the bucket at `location`, fetch and decode `path`'s blob, and write
/// the decoded bytes to stdout.
pub async fn run(config: &CfsConfig, location: &str, path: &str) -> Result<()> {
    let downloader = build_downloader(config)?;
    let bucket = downloader.load_bucket_at(location).await?;

    let content = bucket
        .contents
        .get(path)
        .ok_or_else(|| CliError::FileNotFound(path.to_string()))?;

    let raw = downloader.fetch_raw(content.hash).await?;
    let decoded = downloader.decode(&raw, content.attr)?;

    std::io::stdout().write_all(&decoded)?;
    Ok(())
}
