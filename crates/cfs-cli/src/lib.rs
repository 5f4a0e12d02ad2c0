//! The `cfs` command-line client: publishes local directories to a
//! content-addressed cabinet, syncs them back down, and inspects or
//! repackages what is already there.
//!
//! # Architecture
//!
//! - `config`: `.cfsenv` loading and the bucket-cache-path derivation.
//! - `commands`: one handler per subcommand, each a thin driver over
//!   `cfs-client`/`cfs-downloader`/`cfs-formats`/`cfs-backend`.
//! - `filter`: the `--filter-cmd` hook shared by `sync` and `merge`.
//! - `error`: the CLI-level error type every handler returns.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;

pub use cli::{Cli, Commands};
pub use config::CfsConfig;
pub use error::{CliError, Result};
