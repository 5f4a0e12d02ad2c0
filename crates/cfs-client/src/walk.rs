//! Directory walking: collect `(bucket key, absolute path)` pairs sorted
//! ascending by key, so a publish run is deterministic regardless of the
//! filesystem's own directory-entry order.

use std::path::{Path, PathBuf};

use crate::error::{ClientError, Result};

/// Extensions never treated as content, regardless of `WalkOptions`.
const SKIP_EXTENSIONS: &[&str] = &["meta", "manifest", "tmx", "png"];

/// Basename glob patterns never treated as content. `*` matches any run of
/// characters; each pattern is anchored at both ends.
const EXCLUDE_GLOBS: &[&str] = &[".*", "*.vdat", "cfs", "*.meta", "*.tmx"];

/// Recursion and key-derivation knobs for a walk, mirroring the `recursive`
/// and `flatten` fields of a publish's configuration.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Recurse into subdirectories below the walk root.
    pub recursive: bool,
    /// Use each file's basename as its bucket key instead of its
    /// root-relative slash path.
    pub flatten: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            flatten: false,
        }
    }
}

fn glob_match(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == name,
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
    }
}

/// Whether `basename` is skipped by the static walk rules: dotfiles,
/// `#`-prefixed, `~`-suffixed, a skip-listed extension, or an exclude glob.
fn is_skipped(basename: &str) -> bool {
    if basename.starts_with('.') || basename.starts_with('#') || basename.ends_with('~') {
        return true;
    }
    let ext_skipped = Path::new(basename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SKIP_EXTENSIONS.contains(&ext));
    ext_skipped || EXCLUDE_GLOBS.iter().any(|pat| glob_match(pat, basename))
}

/// Walk `root` with the default options (recursive, not flattened).
pub fn walk_sorted(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    walk_with_options(root, WalkOptions::default())
}

/// Walk `root`, applying the skip rules and `options`, returning
/// `(bucket key, absolute path)` pairs sorted ascending by key.
pub fn walk_with_options(root: &Path, options: WalkOptions) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        options.recursive && !is_skipped(&name)
    });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let basename = entry.file_name().to_string_lossy().into_owned();
        if is_skipped(&basename) {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_str()
            .ok_or_else(|| ClientError::InvalidPath(entry.path().display().to_string()))?
            .replace(std::path::MAIN_SEPARATOR, "/");

        let key = if options.flatten { basename } else { rel };
        files.push((key, entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, b"x").expect("write");
    }

    #[test]
    fn skips_dotfiles_hash_prefixed_and_tilde_suffixed() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "keep.txt");
        touch(dir.path(), ".hidden");
        touch(dir.path(), "#scratch");
        touch(dir.path(), "backup~");

        let files = walk_sorted(dir.path()).expect("walk");
        let keys: Vec<&str> = files.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["keep.txt"]);
    }

    #[test]
    fn skips_static_extensions_and_exclude_globs() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "keep.txt");
        touch(dir.path(), "art.png");
        touch(dir.path(), "level.tmx");
        touch(dir.path(), "level.meta");
        touch(dir.path(), "save.vdat");
        touch(dir.path(), "cfs");

        let files = walk_sorted(dir.path()).expect("walk");
        let keys: Vec<&str> = files.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["keep.txt"]);
    }

    #[test]
    fn non_recursive_skips_subdirectories() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "root.txt");
        touch(dir.path(), "sub/nested.txt");

        let options = WalkOptions {
            recursive: false,
            flatten: false,
        };
        let files = walk_with_options(dir.path(), options).expect("walk");
        let keys: Vec<&str> = files.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["root.txt"]);
    }

    #[test]
    fn flatten_uses_basename_as_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "sub/nested.txt");

        let options = WalkOptions {
            recursive: true,
            flatten: true,
        };
        let files = walk_with_options(dir.path(), options).expect("walk");
        assert_eq!(files[0].0, "nested.txt");
    }

    #[test]
    fn sorted_ascending_by_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "b.txt");
        touch(dir.path(), "a.txt");

        let files = walk_sorted(dir.path()).expect("walk");
        let keys: Vec<&str> = files.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a.txt", "b.txt"]);
    }
}
