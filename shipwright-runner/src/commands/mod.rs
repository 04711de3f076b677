//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod plan;
mod run;
mod targets;

pub use plan::PlanArgs;
pub use run::RunArgs;
pub use targets::TargetsArgs;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use shipwright_core::domain::target::{HostPlatform, TargetRegistry};
use shipwright_core::manifest::PipelineManifest;
use tracing::info;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build every target of a release and attach the binaries to it
    Run(RunArgs),
    /// Show the jobs a run would execute without running them
    Plan(PlanArgs),
    /// List the targets of the build matrix
    Targets(TargetsArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run(args) => run::handle_run(args, config).await,
        Commands::Plan(args) => plan::handle_plan(args, &config),
        Commands::Targets(args) => targets::handle_targets(args, &config),
    }
}

/// Options narrowing the build matrix, shared by every command
#[derive(Args, Debug, Default)]
pub struct MatrixArgs {
    /// Only build this target (repeatable)
    #[arg(long = "target", value_name = "TRIPLE")]
    pub targets: Vec<String>,

    /// Only build targets whose host platform is this machine's
    #[arg(long)]
    pub host_only: bool,
}

impl MatrixArgs {
    /// Loads the manifest and narrows its registry
    pub fn resolve(&self, config: &Config) -> Result<(PipelineManifest, TargetRegistry)> {
        let manifest = config.load_manifest()?;
        let mut registry = manifest.registry()?;

        if !self.targets.is_empty() {
            registry = registry
                .select(&self.targets)
                .context("Invalid --target selection")?;
        }

        if self.host_only {
            let host = HostPlatform::current()
                .context("--host-only is not supported on this operating system")?;
            registry = registry.for_host(host);
            info!("Restricted matrix to {} target(s) for host {}", registry.len(), host);
        }

        Ok((manifest, registry))
    }
}
