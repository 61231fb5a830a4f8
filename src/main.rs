//! NSndfile CLI - Sound File Inspector
//!
//! Command-line front end over the libsndfile bindings.

use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nsndfile::cli::{commands, Cli, Commands};
use nsndfile::{SndfileApi, SndfileConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    info!("NSndfile v{}", env!("CARGO_PKG_VERSION"));

    let config = match cli.library {
        Some(path) => SndfileConfig::new().with_library_path(path),
        None => SndfileConfig::from_env(),
    };
    let api = SndfileApi::load(&config).context("failed to load libsndfile")?;
    info!(library = %api.native().path().display(), "using {}", api.version());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Info { path } => commands::info(&api, &path, &mut out)
            .with_context(|| format!("info failed for {}", path.display())),
        Commands::Peak { path } => commands::peak(&api, &path, &mut out)
            .with_context(|| format!("peak scan failed for {}", path.display())),
        Commands::Version => commands::version(&api, &mut out).context("version query failed"),
        Commands::Dump { path, kind, items } => commands::dump(&api, &path, kind, items, &mut out)
            .with_context(|| format!("dump failed for {}", path.display())),
    }
}
