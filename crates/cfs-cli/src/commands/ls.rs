//! `cfs ls` — list a bucket's entries, or verify their presence on the backend.

use crate::commands::build_downloader;
use crate::config::CfsConfig;
use crate::error::Result;

/// Print `Path\tOrigHash\tOrigSize\tTime(RFC3339)` per entry sorted by
/// path, or, with `verify`, `Path\t(ok|ng)` after checking each entry's
/// presence on the backend.
pub async fn run(config: &CfsConfig, location: &str, verify: bool) -> Result<()> {
    let downloader = build_downloader(config)?;
    let bucket = downloader.load_bucket_at(location).await?;

    if verify {
        let status = downloader.exists_all(&bucket).await;
        for (path, content) in &bucket.contents {
            let ok = if status.get(path).copied().unwrap_or(false) {
                "ok"
            } else {
                "ng"
            };
            println!("{}\t{ok}", content.path);
        }
    } else {
        for content in bucket.contents.values() {
            println!(
                "{}\t{}\t{}\t{}",
                content.path,
                content.orig_hash.to_hex(),
                content.orig_size,
                content.time.to_rfc3339()
            );
        }
    }

    Ok(())
}
