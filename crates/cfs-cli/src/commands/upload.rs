//! `cfs upload` — publish one or more directories to the cabinet.

use std::ffi::OsString;
use std::path::PathBuf;

use cfs_client::{Client, WalkOptions};
use cfs_formats::Bucket;

use crate::commands::build_storage;
use crate::config::{derive_bucket_path, CfsConfig};
use crate::error::Result;

/// Walk `dirs` (defaulting to `.`) and publish every file to the bucket at
/// `bucket_path` (auto-derived from the cabinet/cwd/dirs when absent),
/// removing stale entries and finishing the publish.
pub async fn run(
    config: &CfsConfig,
    dirs: Vec<PathBuf>,
    tag: Option<String>,
    bucket_path: Option<PathBuf>,
    output: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let dirs = if dirs.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        dirs
    };

    let bucket_path = match bucket_path {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir()?;
            let abs_dirs: Vec<PathBuf> = dirs
                .iter()
                .map(|d| cwd.join(d))
                .collect();
            derive_bucket_path(&config.cabinet, &cwd, &abs_dirs)?
        }
    };

    let mut bucket = if force {
        let mut b = Bucket::new();
        b.path = Some(bucket_path.clone());
        b
    } else {
        Bucket::from_file(bucket_path.clone())?
    };
    if let Some(tag) = tag {
        bucket.tag = Some(tag);
    }

    let storage = build_storage(config)?;
    let client = Client::new(storage, config.backend_config());
    let walk_options = WalkOptions {
        recursive: config.recursive,
        flatten: config.flatten,
    };

    for dir in &dirs {
        client
            .publish_dir_with_options(dir, &mut bucket, force, walk_options)
            .await?;
    }

    bucket.remove_untouched();
    let hash = client.finish(&mut bucket).await?;

    std::fs::write(&bucket_path, bucket.dump())?;
    let mut hash_sibling = OsString::from(bucket_path.as_os_str());
    hash_sibling.push(".hash");
    std::fs::write(PathBuf::from(hash_sibling), hash.to_hex())?;

    if let Some(output) = output {
        std::fs::write(output, hash.to_hex())?;
    }

    Ok(())
}
