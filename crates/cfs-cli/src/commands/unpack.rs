//! `cfs unpack` — extract a pack file's entries, or list them.

use std::path::Path;

use cfs_formats::PackFile;

use crate::error::Result;

/// With `output`, extract every entry under `output`; otherwise print
/// `Path\tSize\tHash` per entry.
pub fn run(pack_file: &Path, output: Option<&Path>) -> Result<()> {
    let pack = PackFile::open(pack_file)?;

    match output {
        Some(dir) => {
            for entry in &pack.entries {
                let dest = dir.join(&entry.path);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let bytes = pack.get(&entry.path).unwrap_or(&[]);
                std::fs::write(&dest, bytes)?;
            }
        }
        None => {
            for entry in &pack.entries {
                println!("{}\t{}\t{}", entry.path, entry.size, entry.hash.to_hex());
            }
        }
    }

    Ok(())
}
