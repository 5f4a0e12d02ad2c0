//! The tag record: a small JSON document pointing at a published bucket,
//! plus the key material needed to decode it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cfs_crypto::{ContentAttribute, Hash};

use crate::error::FormatError;

/// A named pointer to a bucket's hash, uploaded alongside the bucket itself
/// so that clients can discover the current manifest by tag name instead of
/// by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFile {
    /// Tag name, e.g. `"live"` or `"ptr"`.
    pub name: String,
    /// When this tag was published.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Hex-encoded encryption key used for the bucket's blobs, if any.
    /// Always present in the JSON (as `null` when absent) — §6 shows it
    /// as a fixed field of the tag record, not an optional one.
    #[serde(rename = "encryptKey", default)]
    pub encrypt_key: Option<String>,
    /// Hex-encoded IV used for the bucket's blobs, if any. Same always-
    /// present treatment as `encrypt_key`.
    #[serde(rename = "encryptIv", default)]
    pub encrypt_iv: Option<String>,
    /// Content attribute bits the bucket's blobs were encoded with.
    pub attr: u8,
    /// Hash of the bucket manifest this tag points at.
    pub hash: String,
}

impl TagFile {
    /// Build a tag record for `bucket_hash`, published under `name`.
    #[must_use]
    pub fn new(
        name: String,
        created_at: DateTime<Utc>,
        encrypt_key: Option<&[u8]>,
        encrypt_iv: Option<&[u8; 16]>,
        attr: ContentAttribute,
        bucket_hash: Hash,
    ) -> Self {
        Self {
            name,
            created_at,
            encrypt_key: encrypt_key.map(hex::encode),
            encrypt_iv: encrypt_iv.map(hex::encode),
            attr: attr.bits(),
            hash: bucket_hash.to_hex(),
        }
    }

    /// Parse a tag record from its JSON bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn dump(&self) -> Result<Vec<u8>, FormatError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// The bucket hash this tag points at.
    pub fn bucket_hash(&self) -> Result<Hash, FormatError> {
        Ok(Hash::from_hex(&self.hash)?)
    }

    /// The raw encryption key bytes, if this tag carries one.
    pub fn decoded_encrypt_key(&self) -> Result<Option<Vec<u8>>, FormatError> {
        self.encrypt_key
            .as_deref()
            .map(|s| hex::decode(s).map_err(|_| FormatError::InvalidPath))
            .transpose()
    }

    /// The raw IV bytes, if this tag carries one.
    pub fn decoded_encrypt_iv(&self) -> Result<Option<[u8; 16]>, FormatError> {
        let Some(s) = self.encrypt_iv.as_deref() else {
            return Ok(None);
        };
        let bytes = hex::decode(s).map_err(|_| FormatError::InvalidPath)?;
        let iv: [u8; 16] = bytes.try_into().map_err(|_| FormatError::InvalidPath)?;
        Ok(Some(iv))
    }

    /// The content attribute this tag's bucket was encoded with.
    #[must_use]
    pub fn content_attribute(&self) -> ContentAttribute {
        ContentAttribute::from_bits(self.attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagFile {
        TagFile::new(
            "live".to_string(),
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .expect("valid rfc3339")
                .with_timezone(&Utc),
            Some(b"0123456789abcdef"),
            Some(b"fedcba9876543210"),
            ContentAttribute::COMPRESSED | ContentAttribute::CRYPTED,
            Hash::from_data(b"bucket contents"),
        )
    }

    #[test]
    fn dump_then_parse_round_trips() {
        let tag = sample();
        let dumped = tag.dump().expect("dump");
        let parsed = TagFile::parse(&dumped).expect("parse");
        assert_eq!(parsed, tag);
    }

    #[test]
    fn decodes_key_iv_and_hash() {
        let tag = sample();
        assert_eq!(
            tag.decoded_encrypt_key().expect("key"),
            Some(b"0123456789abcdef".to_vec())
        );
        assert_eq!(
            tag.decoded_encrypt_iv().expect("iv"),
            Some(*b"fedcba9876543210")
        );
        assert_eq!(tag.bucket_hash().expect("hash"), Hash::from_data(b"bucket contents"));
        assert!(tag.content_attribute().compressed());
        assert!(tag.content_attribute().crypted());
    }

    #[test]
    fn key_and_iv_are_present_as_null_when_absent() {
        let tag = TagFile::new(
            "unencrypted".to_string(),
            Utc::now(),
            None,
            None,
            ContentAttribute::NONE,
            Hash::from_data(b"plain"),
        );
        let dumped = String::from_utf8(tag.dump().expect("dump")).expect("utf8");
        assert!(dumped.contains("\"encryptKey\": null"));
        assert!(dumped.contains("\"encryptIv\": null"));

        let parsed = TagFile::parse(dumped.as_bytes()).expect("parse");
        assert_eq!(parsed, tag);
    }
}
