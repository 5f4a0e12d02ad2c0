//! URL-scheme dispatch: turn a cabinet URL into the right [`Storage`] impl.

use url::Url;

use crate::cfs_http::CfsStorage;
use crate::cloud::CloudStorage;
use crate::error::{BackendError, Result};
use crate::file::FileStorage;
use crate::storage::Storage;

/// Parse `url` and construct the matching backend.
///
/// Recognized schemes: `file`, `http`/`https`/`cfs`/`cfs+http` (the `cfs`
/// HTTP admin API — spec.md §4.5 accepts either a bare `http(s)://host/` or
/// a `cfs://host/` URL for this backend), `gs` (Google Cloud Storage), `s3`
/// (Amazon S3 or an S3-compatible store).
///
/// `admin_user`/`admin_pass` (§4.7) are passed to the `cfs` admin backend
/// for requests whose URL carries no Basic-auth userinfo of its own.
pub fn storage_from_url(
    url_str: &str,
    admin_user: Option<&str>,
    admin_pass: Option<&str>,
) -> Result<Box<dyn Storage>> {
    let url = Url::parse(url_str)?;
    match url.scheme() {
        "file" => Ok(Box::new(FileStorage::new(
            url.to_file_path()
                .map_err(|()| BackendError::InvalidUrl(url::ParseError::EmptyHost))?,
        ))),
        "http" | "https" | "cfs" | "cfs+http" => {
            Ok(Box::new(CfsStorage::from_url(&url, admin_user, admin_pass)?))
        }
        "gs" => Ok(Box::new(CloudStorage::gcs(&url)?)),
        "s3" => Ok(Box::new(CloudStorage::s3(&url)?)),
        other => Err(BackendError::UnsupportedScheme(other.to_string())),
    }
}
