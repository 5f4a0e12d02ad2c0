//! `cfs config` — print the resolved cabinet and downloader URL.

use crate::commands::downloader_url;
use crate::config::CfsConfig;
use crate::error::Result;

/// Print the resolved cabinet URL and the downloader URL computed from it.
pub fn run(config: &CfsConfig) -> Result<()> {
    println!("Cabinet       : {}", config.cabinet);
    println!("Downloader URL: {}", downloader_url(config)?);
    Ok(())
}
