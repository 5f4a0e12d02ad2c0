//! `cfs sync` — fetch a bucket's contents into a local directory.

use std::path::Path;

use crate::commands::build_downloader;
use crate::config::CfsConfig;
use crate::error::Result;
use crate::filter;

/// Load the bucket at `location`, optionally narrow it through
/// `filter_cmd`, and sync every entry into `dir`.
pub async fn run(
    config: &CfsConfig,
    location: &str,
    dir: &Path,
    filter_cmd: Option<&str>,
) -> Result<()> {
    let downloader = build_downloader(config)?;
    let mut bucket = downloader.load_bucket_at(location).await?;

    if let Some(cmd) = filter_cmd {
        bucket = filter::filter_bucket(cmd, &bucket).await?;
    }

    downloader.sync(&bucket, dir).await?;

    Ok(())
}
