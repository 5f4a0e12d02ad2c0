//! `cfs merge` — merge several buckets into one tagged bucket.

use std::path::Path;

use cfs_client::Client;
use cfs_formats::Bucket;

use crate::commands::{build_downloader, build_storage};
use crate::config::CfsConfig;
use crate::error::Result;
use crate::filter;

/// Load each of `locations` in order (later locations win on path
/// collision), optionally filter, and publish only the merged manifest
/// blob under `output_tag`. The constituent files are assumed already
/// present on the backend.
pub async fn run(
    config: &CfsConfig,
    output_tag: &str,
    locations: &[String],
    output: Option<&Path>,
    filter_cmd: Option<&str>,
) -> Result<()> {
    let downloader = build_downloader(config)?;
    let mut merged = Bucket::new();

    for location in locations {
        let bucket = downloader.load_bucket_at(location).await?;
        tracing::debug!(files = bucket.contents.len(), %location, "merged bucket");
        merged.merge(&bucket);
    }

    if let Some(cmd) = filter_cmd {
        merged = filter::filter_bucket(cmd, &merged).await?;
    }
    merged.tag = Some(output_tag.to_string());

    let storage = build_storage(config)?;
    let client = Client::new(storage, config.backend_config());
    let hash = client.finish(&mut merged).await?;

    if let Some(output) = output {
        std::fs::write(output, hash.to_hex())?;
    }

    Ok(())
}
