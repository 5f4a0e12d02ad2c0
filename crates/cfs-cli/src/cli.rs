//! Argument parsing: the `cfs` binary's global flags and subcommands,
//! matching the historical CLI's flag names and argument order.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level `cfs` invocation: global flags plus one subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "cfs",
    about = "Content-addressed file sync: publish, sync, pack, and inspect buckets",
    version
)]
pub struct Cli {
    /// Verbose logging.
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Config file to load.
    #[arg(short = 'C', long = "config", global = true, default_value = ".cfsenv")]
    pub config: PathBuf,

    /// Cabinet URL, overriding the config file's `cabinet`.
    #[arg(short = 'c', long, global = true, env = "CFS_CABINET")]
    pub cabinet: Option<String>,

    /// Download URL, overriding the config file's `url`.
    #[arg(long, global = true, env = "CFS_URL")]
    pub url: Option<String>,

    /// Whether new files are zlib-compressed before upload.
    #[arg(long, global = true, env = "CFS_COMPRESS")]
    pub compress: Option<bool>,

    /// Hex or raw AES key for encrypted buckets, overriding the config file.
    #[arg(long, global = true, env = "CFS_ENCRYPT_KEY")]
    pub encrypt_key: Option<String>,

    /// AES IV paired with `--encrypt-key`, overriding the config file.
    #[arg(long, global = true, env = "CFS_ENCRYPT_IV")]
    pub encrypt_iv: Option<String>,

    /// HTTP Basic auth username for the `cfs://` admin backend.
    #[arg(long, global = true, env = "CFS_ADMIN_USER")]
    pub admin_user: Option<String>,

    /// HTTP Basic auth password for the `cfs://` admin backend.
    #[arg(long, global = true, env = "CFS_ADMIN_PASS")]
    pub admin_pass: Option<String>,

    /// Force upload: disable the local bucket-manifest cache read.
    #[arg(short = 'f', long, global = true)]
    pub force: bool,

    /// External command to narrow a bucket's contents before sync/merge.
    #[arg(long = "filter-cmd", global = true)]
    pub filter_cmd: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload files to the cabinet.
    Upload {
        /// Directories to walk; defaults to the current directory.
        dirs: Vec<PathBuf>,
        /// Tag name applied to the published bucket.
        #[arg(short, long)]
        tag: Option<String>,
        /// Explicit local bucket-manifest path; auto-derived if absent.
        #[arg(short, long)]
        bucket: Option<PathBuf>,
        /// Write the resulting bucket hash to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sync a bucket's contents from the cabinet into a directory.
    Sync {
        /// Bucket hash or tag name.
        location: String,
        /// Destination directory.
        dir: PathBuf,
    },

    /// Merge buckets from several locations into one tagged bucket.
    Merge {
        /// Tag name for the merged bucket.
        output_tag: String,
        /// Locations (hash or tag) to merge, later ones win.
        locations: Vec<String>,
        /// Write the resulting bucket hash to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch and decode one file from a bucket, writing it to stdout.
    Cat {
        /// Bucket hash or tag name.
        location: String,
        /// Path within the bucket.
        path: String,
    },

    /// List the files recorded in a bucket.
    Ls {
        /// Bucket hash or tag name.
        location: String,
        /// Check each entry's presence on the backend instead of listing metadata.
        #[arg(long)]
        verify: bool,
    },

    /// Build a pack file from a directory.
    Pack {
        /// Output pack file path.
        pack_file: PathBuf,
        /// Directory to pack.
        dir: PathBuf,
    },

    /// Extract a pack file's entries into a directory, or list them.
    Unpack {
        /// Pack file to read.
        pack_file: PathBuf,
        /// Output directory; when absent, entries are listed instead of extracted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a pack file from a bucket's contents.
    PackBucket {
        /// Bucket hash or tag name.
        location: String,
        /// Output pack file path.
        pack_file: PathBuf,
    },

    /// Compute and write the patch between two pack files.
    Patch {
        /// Base pack file.
        base: PathBuf,
        /// Current pack file.
        current: PathBuf,
        /// Output patch pack file.
        output: PathBuf,
    },

    /// Print the resolved cabinet and downloader URL.
    Config,
}
