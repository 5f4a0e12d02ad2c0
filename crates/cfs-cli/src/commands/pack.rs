//! `cfs pack` — build a pack file from a directory.

use std::path::Path;

use cfs_formats::PackFile;

use crate::error::Result;

/// Build a pack from every file under `dir` and write it to `pack_file`.
pub fn run(pack_file: &Path, dir: &Path) -> Result<()> {
    let bytes = PackFile::new_from_dir(dir)?;
    std::fs::write(pack_file, bytes)?;
    Ok(())
}
