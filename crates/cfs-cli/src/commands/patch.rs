//! `cfs patch` — compute and write the patch between two pack files.

use std::path::Path;

use cfs_formats::PackFile;

use crate::error::Result;

/// Parse `base` and `current`, compute their patch, and write it to `output`.
pub fn run(base: &Path, current: &Path, output: &Path) -> Result<()> {
    let base = PackFile::open(base)?;
    let current = PackFile::open(current)?;
    let patch_bytes = PackFile::patch(&base, &current)?;
    std::fs::write(output, patch_bytes)?;
    Ok(())
}
