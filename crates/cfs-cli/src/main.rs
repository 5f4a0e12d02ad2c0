use clap::Parser;
use tracing_subscriber::EnvFilter;

use cfs_cli::cli::{Cli, Commands};
use cfs_cli::commands;
use cfs_cli::config::CfsConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let mut config = CfsConfig::load(&cli.config)?;
    if let Some(cabinet) = cli.cabinet {
        config.cabinet = cabinet;
    }
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(compress) = cli.compress {
        config.compress = compress;
    }
    if let Some(encrypt_key) = cli.encrypt_key {
        config.encrypt_key = encrypt_key;
    }
    if let Some(encrypt_iv) = cli.encrypt_iv {
        config.encrypt_iv = encrypt_iv;
    }
    if let Some(admin_user) = cli.admin_user {
        config.admin_user = admin_user;
    }
    if let Some(admin_pass) = cli.admin_pass {
        config.admin_pass = admin_pass;
    }

    let result = run(cli.command, &config, cli.force, cli.filter_cmd.as_deref()).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(
    command: Commands,
    config: &CfsConfig,
    force: bool,
    filter_cmd: Option<&str>,
) -> anyhow::Result<()> {
    match command {
        Commands::Upload {
            dirs,
            tag,
            bucket,
            output,
        } => commands::upload::run(config, dirs, tag, bucket, output, force).await?,
        Commands::Sync { location, dir } => {
            commands::sync::run(config, &location, &dir, filter_cmd).await?;
        }
        Commands::Merge {
            output_tag,
            locations,
            output,
        } => {
            commands::merge::run(
                config,
                &output_tag,
                &locations,
                output.as_deref(),
                filter_cmd,
            )
            .await?;
        }
        Commands::Cat { location, path } => {
            commands::cat::run(config, &location, &path).await?;
        }
        Commands::Ls { location, verify } => {
            commands::ls::run(config, &location, verify).await?;
        }
        Commands::Pack { pack_file, dir } => commands::pack::run(&pack_file, &dir)?,
        Commands::Unpack { pack_file, output } => {
            commands::unpack::run(&pack_file, output.as_deref())?;
        }
        Commands::PackBucket {
            location,
            pack_file,
        } => {
            commands::pack_bucket::run(config, &location, &pack_file, filter_cmd).await?;
        }
        Commands::Patch {
            base,
            current,
            output,
        } => commands::patch::run(&base, &current, &output)?,
        Commands::Config => commands::config_cmd::run(config)?,
    }

    Ok(())
}
