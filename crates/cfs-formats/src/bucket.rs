//! The bucket manifest: an in-memory path→content-record map with a
//! deterministic tab-separated on-disk form.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use cfs_crypto::{ContentAttribute, Hash};

use crate::error::FormatError;

/// Path suffixes that are always stored verbatim (`Attr = 0`), regardless of
/// the configured default compression/encryption.
const FORCED_RAW_EXTENSIONS: &[&str] = &["ab", "raw", "pbx", "mp4"];

/// One logical file in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    /// Bucket-relative key, forward-slash separated.
    pub path: String,
    /// Hash of the stored (post-encode) blob.
    pub hash: Hash,
    /// Hash of the original (pre-encode) bytes.
    pub orig_hash: Hash,
    /// Byte length of the stored blob.
    pub size: u64,
    /// Byte length of the original file.
    pub orig_size: u64,
    /// Last-modified timestamp of the source file at publish time.
    pub time: DateTime<Utc>,
    /// Content attribute used when this blob was encoded.
    pub attr: ContentAttribute,
    /// Transient: set during a publish walk if this entry was revisited.
    /// Never serialized.
    pub touched: bool,
}

/// A keyed set of content records plus an optional tag, hash, and backing
/// file path.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    /// Path → content record, naturally sorted by path via `BTreeMap`.
    pub contents: BTreeMap<String, Content>,
    /// Human-readable label, if this bucket is published under a tag.
    pub tag: Option<String>,
    /// The bucket's own hash once serialized and uploaded.
    pub hash: Option<Hash>,
    /// Local backing file, if this bucket is cached on disk.
    pub path: Option<PathBuf>,
}

impl Bucket {
    /// An empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a manifest in the tab-separated form documented in
    /// [`Bucket::dump`].
    ///
    /// Each line must have exactly the seven documented columns; a line with
    /// fewer is rejected rather than partially parsed, and any column that
    /// fails to parse as its expected type is a hard error — there is no
    /// tolerant fallback.
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        let text = String::from_utf8_lossy(bytes);
        let mut contents = BTreeMap::new();

        for line in text.split('\n') {
            if line.is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 3 {
                return Err(FormatError::MalformedLine(line.to_string()));
            }
            if cols.len() < 7 {
                return Err(FormatError::MalformedLine(line.to_string()));
            }

            let hash = Hash::from_hex(cols[0])?;
            let path = cols[1].to_string();
            let size: u64 = cols[2].parse().map_err(|e| FormatError::InvalidField {
                field: "Size",
                source: Box::new(e),
            })?;
            let time: DateTime<Utc> =
                DateTime::parse_from_rfc3339(cols[3])
                    .map_err(FormatError::InvalidTimestamp)?
                    .with_timezone(&Utc);
            let orig_hash = Hash::from_hex(cols[4])?;
            let orig_size: u64 = cols[5].parse().map_err(|e| FormatError::InvalidField {
                field: "OrigSize",
                source: Box::new(e),
            })?;
            let attr_bits: u8 = cols[6].parse().map_err(|e| FormatError::InvalidField {
                field: "Attr",
                source: Box::new(e),
            })?;

            contents.insert(
                path.clone(),
                Content {
                    path,
                    hash,
                    orig_hash,
                    size,
                    orig_size,
                    time,
                    attr: ContentAttribute::from_bits(attr_bits),
                    touched: false,
                },
            );
        }

        Ok(Self {
            contents,
            tag: None,
            hash: None,
            path: None,
        })
    }

    /// Load from a local manifest file. Returns an empty bucket if the file
    /// does not exist.
    pub fn from_file(path: PathBuf) -> Result<Self, FormatError> {
        match std::fs::read(&path) {
            Ok(bytes) => {
                let mut bucket = Self::parse(&bytes)?;
                bucket.path = Some(path);
                Ok(bucket)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut bucket = Self::new();
                bucket.path = Some(path);
                Ok(bucket)
            }
            Err(e) => Err(FormatError::Io(e)),
        }
    }

    /// Serialize: one line per entry sorted ascending by path, seven
    /// tab-separated columns (`Hash Path Size Time OrigHash OrigSize Attr`),
    /// lines joined with `\n`, trailing `\n` appended.
    ///
    /// The output is a deterministic function of the record set: entries
    /// with the same content produce byte-identical dumps regardless of
    /// insertion order, because iteration is over a `BTreeMap` keyed by
    /// path.
    #[must_use]
    pub fn dump(&self) -> Vec<u8> {
        let mut out = String::new();
        for content in self.contents.values() {
            out.push_str(&content.hash.to_hex());
            out.push('\t');
            out.push_str(&content.path);
            out.push('\t');
            out.push_str(&content.size.to_string());
            out.push('\t');
            out.push_str(&content.time.to_rfc3339());
            out.push('\t');
            out.push_str(&content.orig_hash.to_hex());
            out.push('\t');
            out.push_str(&content.orig_size.to_string());
            out.push('\t');
            out.push_str(&content.attr.bits().to_string());
            out.push('\n');
        }
        out.into_bytes()
    }

    /// Overwrite entries in `self` with entries from `other` (key equality
    /// on `Path`; `other` wins).
    pub fn merge(&mut self, other: &Self) {
        for (path, content) in &other.contents {
            self.contents.insert(path.clone(), content.clone());
        }
    }

    /// Drop entries whose `touched` flag is false.
    pub fn remove_untouched(&mut self) {
        self.contents.retain(|_, c| c.touched);
    }

    /// `ContentAttribute::NONE` for the forced-raw extensions
    /// (`.ab`/`.raw`/`.pbx`/`.mp4`), otherwise `default`.
    #[must_use]
    pub fn attribute_for(path: &str, default: ContentAttribute) -> ContentAttribute {
        let ext = std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if FORCED_RAW_EXTENSIONS.contains(&ext) {
            ContentAttribute::NONE
        } else {
            default
        }
    }

    /// Digest of `data` — MD5 is the only hash type this format supports.
    #[must_use]
    pub fn sum(data: &[u8]) -> Hash {
        Hash::from_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_content(path: &str, byte: u8) -> Content {
        let data = vec![byte; 8];
        Content {
            path: path.to_string(),
            hash: Hash::from_data(&data),
            orig_hash: Hash::from_data(&data),
            size: data.len() as u64,
            orig_size: data.len() as u64,
            time: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .expect("valid rfc3339")
                .with_timezone(&Utc),
            attr: ContentAttribute::NONE,
            touched: true,
        }
    }

    #[test]
    fn dump_then_parse_round_trips_except_touched() {
        let mut bucket = Bucket::new();
        bucket
            .contents
            .insert("a".to_string(), sample_content("a", 1));
        bucket
            .contents
            .insert("b".to_string(), sample_content("b", 2));

        let dumped = bucket.dump();
        let parsed = Bucket::parse(&dumped).expect("parse");

        assert_eq!(parsed.contents.len(), 2);
        for (path, content) in &bucket.contents {
            let parsed_content = &parsed.contents[path];
            assert_eq!(parsed_content.hash, content.hash);
            assert_eq!(parsed_content.path, content.path);
            assert_eq!(parsed_content.size, content.size);
            assert_eq!(parsed_content.orig_hash, content.orig_hash);
            assert_eq!(parsed_content.orig_size, content.orig_size);
            assert_eq!(parsed_content.attr, content.attr);
            assert!(!parsed_content.touched);
        }
    }

    #[test]
    fn dump_is_sorted_by_path_regardless_of_insertion_order() {
        let mut bucket = Bucket::new();
        bucket
            .contents
            .insert("zeta".to_string(), sample_content("zeta", 1));
        bucket
            .contents
            .insert("alpha".to_string(), sample_content("alpha", 2));

        let dumped = String::from_utf8(bucket.dump()).expect("utf8");
        let lines: Vec<&str> = dumped.lines().collect();
        assert!(lines[0].contains("alpha"));
        assert!(lines[1].contains("zeta"));
    }

    #[test]
    fn serialization_is_canonical() {
        let mut a = Bucket::new();
        a.contents.insert("x".to_string(), sample_content("x", 9));
        let mut b = Bucket::new();
        b.contents.insert("x".to_string(), sample_content("x", 9));
        assert_eq!(a.dump(), b.dump());
    }

    #[test]
    fn parse_rejects_short_lines() {
        let err = Bucket::parse(b"only\ttwo\n").unwrap_err();
        assert!(matches!(err, FormatError::MalformedLine(_)));
    }

    #[test]
    fn parse_rejects_bad_numeric_field() {
        let line = format!(
            "{}\tpath\tNOTANUMBER\t2024-01-01T00:00:00Z\t{}\t8\t0\n",
            Hash::from_data(b"x").to_hex(),
            Hash::from_data(b"x").to_hex()
        );
        let err = Bucket::parse(line.as_bytes()).unwrap_err();
        assert!(matches!(err, FormatError::InvalidField { field: "Size", .. }));
    }

    #[test]
    fn merge_lets_other_win() {
        let mut base = Bucket::new();
        base.contents
            .insert("a".to_string(), sample_content("a", 1));

        let mut incoming = Bucket::new();
        incoming
            .contents
            .insert("a".to_string(), sample_content("a", 99));
        incoming
            .contents
            .insert("b".to_string(), sample_content("b", 2));

        base.merge(&incoming);
        assert_eq!(base.contents.len(), 2);
        assert_eq!(base.contents["a"].hash, incoming.contents["a"].hash);
    }

    #[test]
    fn remove_untouched_drops_stale_entries() {
        let mut bucket = Bucket::new();
        let mut stale = sample_content("stale", 1);
        stale.touched = false;
        bucket.contents.insert("stale".to_string(), stale);
        bucket
            .contents
            .insert("fresh".to_string(), sample_content("fresh", 2));

        bucket.remove_untouched();
        assert_eq!(bucket.contents.len(), 1);
        assert!(bucket.contents.contains_key("fresh"));
    }

    #[test]
    fn attribute_for_forces_raw_extensions() {
        let default = ContentAttribute::COMPRESSED;
        assert_eq!(
            Bucket::attribute_for("file.raw", default),
            ContentAttribute::NONE
        );
        assert_eq!(
            Bucket::attribute_for("file.ab", default),
            ContentAttribute::NONE
        );
        assert_eq!(Bucket::attribute_for("file.txt", default), default);
    }
}
