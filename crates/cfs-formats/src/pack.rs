//! The pack archive: a single file holding many blobs plus an index, used to
//! publish or fetch a whole directory tree in one request.
//!
//! Layout: a 7-byte fixed header (`"TP"` magic, version, entry-list byte
//! length), followed by the entry list region — which itself starts with a
//! 4-byte entry count, then that many entries — followed by the
//! concatenated blob bytes. `entryListBytes` covers the whole entry list
//! region, entry count included, so a reader only has to parse the fixed
//! header and then read exactly `entryListBytes` more bytes to know where
//! every file lives.

use std::io::Cursor;
use std::path::Path;

use binrw::{BinRead, BinWrite};
use unicode_normalization::UnicodeNormalization;

use cfs_crypto::Hash;

use crate::error::FormatError;

const MAGIC: [u8; 2] = *b"TP";
const VERSION: u8 = 1;
const HEADER_LEN: u32 = 2 + 1 + 4;

#[derive(BinRead, BinWrite)]
#[brw(little)]
struct RawHeader {
    magic: [u8; 2],
    version: u8,
    entry_list_bytes: u32,
}

#[derive(BinRead, BinWrite)]
#[brw(little)]
struct RawEntryList {
    #[bw(calc = entries.len() as u32)]
    entry_count: u32,
    #[br(count = entry_count)]
    entries: Vec<RawEntry>,
}

#[derive(BinRead, BinWrite)]
#[brw(little)]
struct RawEntry {
    #[bw(calc = path.len() as u8)]
    path_len: u8,
    #[br(count = path_len)]
    path: Vec<u8>,
    pos: u32,
    size: u32,
    hash: [u8; 16],
}

/// One file's location within a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    /// Forward-slash-separated path relative to the packed directory.
    pub path: String,
    /// Absolute byte offset of this entry's blob within the pack file.
    pub pos: u32,
    /// Blob length in bytes.
    pub size: u32,
    /// Hash of the blob.
    pub hash: Hash,
}

/// A parsed pack file: its index plus the raw bytes it was read from.
#[derive(Debug, Clone)]
pub struct PackFile {
    /// Entries sorted ascending by path.
    pub entries: Vec<PackEntry>,
    raw: Vec<u8>,
}

/// The result of comparing two packs' entry lists by path and hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackDiff {
    /// Paths present in `current` but not in `base`.
    pub added: Vec<String>,
    /// Paths present in both, with a different hash.
    pub changed: Vec<String>,
    /// Paths present in `base` but not in `current`.
    pub removed: Vec<String>,
}

impl PackFile {
    /// Parse a pack file from its complete raw bytes.
    pub fn parse(raw: Vec<u8>) -> Result<Self, FormatError> {
        let mut cursor = Cursor::new(&raw);
        let header = RawHeader::read(&mut cursor)?;
        if header.magic != MAGIC {
            return Err(FormatError::InvalidMagic);
        }
        if header.version != VERSION {
            return Err(FormatError::UnsupportedVersion(header.version));
        }

        let list_start = u64::from(HEADER_LEN);
        let list_end = list_start + u64::from(header.entry_list_bytes);
        let mut list_cursor = Cursor::new(&raw[list_start as usize..list_end as usize]);
        let raw_list = RawEntryList::read(&mut list_cursor)?;

        let mut entries = Vec::with_capacity(raw_list.entries.len());
        for raw_entry in raw_list.entries {
            let path = String::from_utf8(raw_entry.path).map_err(|_| FormatError::InvalidPath)?;
            entries.push(PackEntry {
                path,
                pos: raw_entry.pos,
                size: raw_entry.size,
                hash: Hash::from_bytes(raw_entry.hash),
            });
        }

        Ok(Self { entries, raw })
    }

    /// Read a pack file from disk.
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        Self::parse(std::fs::read(path)?)
    }

    /// The blob bytes for `path`, if present.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        let entry = self.entries.iter().find(|e| e.path == path)?;
        let start = entry.pos as usize;
        let end = start + entry.size as usize;
        self.raw.get(start..end)
    }

    /// Build a pack from `(path, bytes)` pairs. Paths are NFC-normalized,
    /// entries are sorted ascending by the normalized path, and hashed with
    /// [`Hash::from_data`] before packing.
    ///
    /// The entry list is serialized twice: a first pass with placeholder
    /// offsets establishes `entryListBytes` (the list's own length depends
    /// on path lengths, which vary), and a second pass fills in the real
    /// blob offsets now that the header and list length are known.
    pub fn build(files: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, FormatError> {
        let mut files: Vec<(String, Vec<u8>)> = files
            .into_iter()
            .map(|(path, bytes)| (path.nfc().collect::<String>(), bytes))
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let draft_entries: Vec<PackEntry> = files
            .iter()
            .map(|(path, bytes)| PackEntry {
                path: path.clone(),
                pos: 0,
                size: bytes.len() as u32,
                hash: Hash::from_data(bytes),
            })
            .collect();

        let entry_list_bytes = write_entry_list(&draft_entries)?.len() as u32;

        let mut pos = HEADER_LEN + entry_list_bytes;
        let final_entries: Vec<PackEntry> = draft_entries
            .into_iter()
            .map(|mut e| {
                e.pos = pos;
                pos += e.size;
                e
            })
            .collect();

        let mut out = Vec::new();
        let header = RawHeader {
            magic: MAGIC,
            version: VERSION,
            entry_list_bytes,
        };
        let mut header_cursor = Cursor::new(&mut out);
        header.write(&mut header_cursor)?;

        out.extend(write_entry_list(&final_entries)?);

        for (_, bytes) in &files {
            out.extend_from_slice(bytes);
        }

        Ok(out)
    }

    /// Walk `dir` and build a pack from every regular file found, with
    /// paths stored relative to `dir` using forward slashes.
    pub fn new_from_dir(dir: &Path) -> Result<Vec<u8>, FormatError> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(|e| {
                FormatError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("walkdir error")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            let bytes = std::fs::read(entry.path())?;
            files.push((rel, bytes));
        }
        Self::build(files)
    }

    /// Compare two packs' entry lists by path and hash.
    #[must_use]
    pub fn diff(base: &Self, current: &Self) -> PackDiff {
        let mut result = PackDiff::default();
        for entry in &current.entries {
            match base.entries.iter().find(|e| e.path == entry.path) {
                None => result.added.push(entry.path.clone()),
                Some(base_entry) if base_entry.hash != entry.hash => {
                    result.changed.push(entry.path.clone());
                }
                Some(_) => {}
            }
        }
        for entry in &base.entries {
            if !current.entries.iter().any(|e| e.path == entry.path) {
                result.removed.push(entry.path.clone());
            }
        }
        result
    }

    /// Build a patch pack: every entry added or changed between `base` and
    /// `current`, carrying `current`'s bytes. The patch is itself a valid
    /// pack file — applying it means unpacking it over the base directory,
    /// since removed paths leave no trace to act on here.
    pub fn patch(base: &Self, current: &Self) -> Result<Vec<u8>, FormatError> {
        let diff = Self::diff(base, current);
        let mut files = Vec::with_capacity(diff.added.len() + diff.changed.len());
        for path in diff.added.iter().chain(&diff.changed) {
            let bytes = current.get(path).ok_or(FormatError::InvalidPath)?;
            files.push((path.clone(), bytes.to_vec()));
        }
        Self::build(files)
    }
}

/// Serialize the whole entry list region: the 4-byte entry count followed
/// by each entry. The returned length is the value stored as
/// `entryListBytes`.
fn write_entry_list(entries: &[PackEntry]) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let raw_list = RawEntryList {
        entries: entries
            .iter()
            .map(|entry| RawEntry {
                path: entry.path.clone().into_bytes(),
                pos: entry.pos,
                size: entry.size,
                hash: *entry.hash.as_bytes(),
            })
            .collect(),
    };
    raw_list.write(&mut cursor)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_round_trips() {
        let files = vec![
            ("b.txt".to_string(), b"second file".to_vec()),
            ("a.txt".to_string(), b"first file".to_vec()),
        ];
        let bytes = PackFile::build(files).expect("build");
        let pack = PackFile::parse(bytes).expect("parse");

        assert_eq!(pack.entries.len(), 2);
        assert_eq!(pack.entries[0].path, "a.txt");
        assert_eq!(pack.entries[1].path, "b.txt");
        assert_eq!(pack.get("a.txt"), Some(&b"first file"[..]));
        assert_eq!(pack.get("b.txt"), Some(&b"second file"[..]));
        assert_eq!(pack.get("missing"), None);
    }

    #[test]
    fn entries_are_sorted_regardless_of_input_order() {
        let files = vec![
            ("z".to_string(), b"z".to_vec()),
            ("a".to_string(), b"a".to_vec()),
            ("m".to_string(), b"m".to_vec()),
        ];
        let bytes = PackFile::build(files).expect("build");
        let pack = PackFile::parse(bytes).expect("parse");
        let paths: Vec<&str> = pack.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "m", "z"]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = PackFile::build(vec![("a".to_string(), b"a".to_vec())]).expect("build");
        bytes[0] = b'X';
        let err = PackFile::parse(bytes).unwrap_err();
        assert!(matches!(err, FormatError::InvalidMagic));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = PackFile::build(vec![("a".to_string(), b"a".to_vec())]).expect("build");
        bytes[2] = 9;
        let err = PackFile::parse(bytes).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedVersion(9)));
    }

    #[test]
    fn build_normalizes_paths_to_nfc() {
        // "é" as NFD (e + combining acute) normalizes to the NFC precomposed form.
        let decomposed = format!("caf{}\u{0301}.txt", 'e');
        let bytes = PackFile::build(vec![(decomposed, b"x".to_vec())]).expect("build");
        let pack = PackFile::parse(bytes).expect("parse");
        assert_eq!(pack.entries[0].path, "café.txt");
    }

    #[test]
    fn new_from_dir_packs_every_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("one.txt"), b"1").expect("write");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        std::fs::write(dir.path().join("sub/two.txt"), b"22").expect("write");

        let bytes = PackFile::new_from_dir(dir.path()).expect("pack dir");
        let pack = PackFile::parse(bytes).expect("parse");
        assert_eq!(pack.entries.len(), 2);
        assert_eq!(pack.get("one.txt"), Some(&b"1"[..]));
        assert_eq!(pack.get("sub/two.txt"), Some(&b"22"[..]));
    }

    #[test]
    fn diff_reports_added_changed_removed() {
        let base = PackFile::build(vec![
            ("keep".to_string(), b"same".to_vec()),
            ("gone".to_string(), b"bye".to_vec()),
            ("edit".to_string(), b"old".to_vec()),
        ])
        .and_then(PackFile::parse)
        .expect("base");

        let current = PackFile::build(vec![
            ("keep".to_string(), b"same".to_vec()),
            ("edit".to_string(), b"new".to_vec()),
            ("new".to_string(), b"fresh".to_vec()),
        ])
        .and_then(PackFile::parse)
        .expect("current");

        let diff = PackFile::diff(&base, &current);
        assert_eq!(diff.added, vec!["new".to_string()]);
        assert_eq!(diff.changed, vec!["edit".to_string()]);
        assert_eq!(diff.removed, vec!["gone".to_string()]);
    }

    #[test]
    fn patch_contains_only_added_and_changed_bytes_and_is_itself_a_pack() {
        let base = PackFile::build(vec![
            ("keep".to_string(), b"same".to_vec()),
            ("gone".to_string(), b"bye".to_vec()),
            ("edit".to_string(), b"old".to_vec()),
        ])
        .and_then(PackFile::parse)
        .expect("base");

        let current = PackFile::build(vec![
            ("keep".to_string(), b"same".to_vec()),
            ("edit".to_string(), b"new".to_vec()),
            ("new".to_string(), b"fresh".to_vec()),
        ])
        .and_then(PackFile::parse)
        .expect("current");

        let patch_bytes = PackFile::patch(&base, &current).expect("patch");
        let patch = PackFile::parse(patch_bytes).expect("parse patch");

        assert_eq!(patch.entries.len(), 2);
        assert_eq!(patch.get("edit"), Some(&b"new"[..]));
        assert_eq!(patch.get("new"), Some(&b"fresh"[..]));
        assert_eq!(patch.get("keep"), None);
        assert_eq!(patch.get("gone"), None);
    }

    #[test]
    fn patch_between_identical_packs_is_empty() {
        let pack = PackFile::build(vec![("a".to_string(), b"a".to_vec())])
            .and_then(PackFile::parse)
            .expect("pack");

        let patch_bytes = PackFile::patch(&pack, &pack).expect("patch");
        let patch = PackFile::parse(patch_bytes).expect("parse patch");
        assert!(patch.entries.is_empty());
    }
}
