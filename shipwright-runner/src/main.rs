//! Shipwright
//!
//! Builds a project's release binaries for every target of a build matrix and
//! attaches them to a published release.
//!
//! Architecture:
//! - Configuration: settings from the environment, overridden by CLI flags
//! - Services: one per pipeline stage (provision, toolchain, build, publish)
//! - Scheduler: per-job stage sequence and the concurrent fan-out over targets
//! - Commands: `run`, `plan` and `targets`
//!
//! Every job runs in its own task with a private output directory. A failing
//! job is reported but never stops the others.

mod cancel;
mod commands;
mod config;
mod context;
mod error;
mod process;
mod scheduler;
mod service;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Commands, handle_command};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "shipwright", version)]
#[command(about = "Cross-platform release build and publishing pipeline", long_about = None)]
struct Cli {
    /// Pipeline manifest (defaults to shipwright.json in the source directory)
    #[arg(long, global = true, env = "SHIPWRIGHT_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Project checkout to build
    #[arg(long, global = true, env = "SHIPWRIGHT_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Root directory for per-job build output
    #[arg(long, global = true, env = "SHIPWRIGHT_WORKSPACE")]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipwright_runner=info,shipwright_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(manifest) = cli.manifest {
        config.manifest_path = Some(manifest);
    }
    if let Some(source_dir) = cli.source_dir {
        config.source_dir = source_dir;
    }
    if let Some(workspace) = cli.workspace {
        config.workspace_base = workspace;
    }
    config.validate()?;

    info!("Starting Shipwright {}", env!("CARGO_PKG_VERSION"));
    debug!("Loaded configuration: {:?}", config);

    handle_command(cli.command, config).await
}
