//! Publish-side client: walks a directory, encodes each file, and uploads
//! new or changed blobs through a bounded worker pool.

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod walk;

pub use client::{Client, UploadSummary};
pub use error::{ClientError, Result};
pub use walk::WalkOptions;
