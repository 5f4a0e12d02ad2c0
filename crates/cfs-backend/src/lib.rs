//! Storage backends for `cfs`: a `Storage` trait plus `file://`, `cfs://`,
//! `gs://`, and `s3://` implementations, dispatched by URL scheme.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = cfs_backend::storage_from_url("file:///var/cfs/cabinet", None, None)?;
//! println!("downloader url: {}", storage.downloader_url());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cfs_http;
pub mod cloud;
pub mod dispatch;
pub mod error;
pub mod file;
pub mod retry;
pub mod storage;
pub mod transport;

pub use cfs_http::CfsStorage;
pub use cloud::CloudStorage;
pub use dispatch::storage_from_url;
pub use error::{BackendError, Result};
pub use file::FileStorage;
pub use retry::RetryPolicy;
pub use storage::{Config, Storage, DEFAULT_FANOUT, DEFAULT_UPLOAD_WORKERS};
pub use transport::{HttpClient, HttpConfig};
