//! The `--filter-cmd` hook shared by `sync` and `merge`: a bucket's
//! manifest text is piped through an external command and its stdout is
//! re-parsed as the narrowed bucket.

use std::process::Stdio;

use cfs_formats::Bucket;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{CliError, Result};

/// Run `bucket.dump()` through `filter_cmd`'s stdin and re-parse its stdout
/// as the new bucket. A non-zero exit or empty stdout is an error. `argv[0]`
/// is split on whitespace, matching the historical source's `exec.Command`
/// invocation (no shell is involved).
pub async fn filter_bucket(filter_cmd: &str, bucket: &Bucket) -> Result<Bucket> {
    let output = run_filter(filter_cmd, &bucket.dump()).await?;
    Ok(Bucket::parse(&output)?)
}

async fn run_filter(filter_cmd: &str, input: &[u8]) -> Result<Vec<u8>> {
    let mut parts = filter_cmd.split_whitespace();
    let program = parts.next().ok_or_else(|| CliError::FilterFailed {
        cmd: filter_cmd.to_string(),
        reason: "empty filter command".to_string(),
    })?;

    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| CliError::FilterFailed {
            cmd: filter_cmd.to_string(),
            reason: source.to_string(),
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| CliError::FilterFailed {
        cmd: filter_cmd.to_string(),
        reason: "failed to open stdin".to_string(),
    })?;
    let input = input.to_vec();
    let write_task = tokio::spawn(async move {
        let _ = stdin.write_all(&input).await;
    });

    let output = child.wait_with_output().await.map_err(|source| CliError::FilterFailed {
        cmd: filter_cmd.to_string(),
        reason: source.to_string(),
    })?;
    let _ = write_task.await;

    if !output.status.success() {
        return Err(CliError::FilterFailed {
            cmd: filter_cmd.to_string(),
            reason: format!("exited with {}", output.status),
        });
    }
    if output.stdout.is_empty() {
        return Err(CliError::FilterFailed {
            cmd: filter_cmd.to_string(),
            reason: "no output from filter".to_string(),
        });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfs_crypto::Hash;
    use cfs_formats::Content;

    fn sample_bucket() -> Bucket {
        let mut bucket = Bucket::new();
        bucket.contents.insert(
            "a.txt".to_string(),
            Content {
                path: "a.txt".to_string(),
                hash: Hash::from_data(b"a"),
                orig_hash: Hash::from_data(b"a"),
                size: 1,
                orig_size: 1,
                time: chrono::Utc::now(),
                attr: cfs_crypto::ContentAttribute::NONE,
                touched: true,
            },
        );
        bucket
    }

    #[tokio::test]
    async fn cat_passes_manifest_through_unchanged_with_cat_filter() {
        let bucket = sample_bucket();
        let filtered = filter_bucket("cat", &bucket).await.expect("filter");
        assert_eq!(filtered.contents.len(), 1);
        assert!(filtered.contents.contains_key("a.txt"));
    }

    #[tokio::test]
    async fn empty_filter_command_is_rejected() {
        let bucket = sample_bucket();
        let err = filter_bucket("  ", &bucket).await.unwrap_err();
        assert!(matches!(err, CliError::FilterFailed { .. }));
    }
}
