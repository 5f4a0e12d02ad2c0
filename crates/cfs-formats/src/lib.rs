//! On-disk and on-the-wire formats: the bucket manifest, the pack archive,
//! and the tag record.

#![warn(missing_docs)]

pub mod bucket;
pub mod error;
pub mod pack;
pub mod tag;

pub use bucket::{Bucket, Content};
pub use error::FormatError;
pub use pack::PackFile;
pub use tag::TagFile;
