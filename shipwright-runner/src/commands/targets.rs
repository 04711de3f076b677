//! Targets command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use shipwright_core::domain::target::HostPlatform;

use super::MatrixArgs;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct TargetsArgs {
    #[command(flatten)]
    pub matrix: MatrixArgs,
}

/// List the targets of the (narrowed) build matrix
pub fn handle_targets(args: TargetsArgs, config: &Config) -> Result<()> {
    let (manifest, registry) = args.matrix.resolve(config)?;
    let host = HostPlatform::current();

    if registry.is_empty() {
        println!("{}", "No targets registered.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} target(s):", registry.len()).bold()
    );
    println!();
    for target in registry.list_targets() {
        let platform = if Some(target.host_platform) == host {
            target.host_platform.to_string().green()
        } else {
            target.host_platform.to_string().normal()
        };
        println!(
            "  {} {:<32} {:<8} {}",
            "▸".cyan(),
            target.triple.bold(),
            platform,
            target.asset_name(&manifest.project).dimmed()
        );
    }

    Ok(())
}
