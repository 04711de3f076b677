//! Plan command handler
//!
//! Prints the jobs a run would execute: provisioning, toolchain, artifact
//! location and published asset name for every target. Nothing is executed.

use anyhow::Result;
use clap::Args;
use colored::*;
use shipwright_core::domain::job::Job;
use shipwright_core::domain::release::Release;
use shipwright_core::domain::target::{HostPlatform, TargetSpec, asset_name};
use shipwright_core::manifest::PipelineManifest;
use std::sync::Arc;

use super::MatrixArgs;
use crate::config::Config;
use crate::scheduler::plan_jobs;
use crate::service::{BuildExecutor, CargoBuild};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub matrix: MatrixArgs,

    /// Release id used to lay out output directories
    #[arg(long, default_value_t = 0)]
    pub release_id: u64,
}

/// Handle the plan command
pub fn handle_plan(args: PlanArgs, config: &Config) -> Result<()> {
    let (manifest, registry) = args.matrix.resolve(config)?;
    let release = Arc::new(Release::new(args.release_id, ""));
    let jobs = plan_jobs(&registry, &release, &config.workspace_base);
    let host = HostPlatform::current();

    if jobs.is_empty() {
        println!("{}", "No targets to build.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{} job(s) for {} with toolchain {}:",
            jobs.len(),
            manifest.project,
            manifest.toolchain
        )
        .bold()
    );
    println!();

    let executor = BuildExecutor::new(
        Arc::new(CargoBuild::new(
            &config.cargo,
            config.source_dir.clone(),
            &manifest.toolchain,
        )),
        &manifest.project,
    );
    for job in &jobs {
        print_job(job, &manifest, &executor, host);
    }

    Ok(())
}

fn print_job(
    job: &Job,
    manifest: &PipelineManifest,
    executor: &BuildExecutor,
    host: Option<HostPlatform>,
) {
    let target = &job.target;

    println!("  {} {}", "▸".cyan(), target.triple.bold());
    println!("    Host:       {}", target.host_platform);
    match provision_summary(target, manifest, host) {
        Some(summary) => println!("    Provision:  {}", summary),
        None => println!("    Provision:  {}", "none".dimmed()),
    }
    println!(
        "    Artifact:   {}",
        executor
            .artifact_path(target, &job.output_dir)
            .display()
            .to_string()
            .dimmed()
    );
    println!(
        "    Asset:      {}",
        asset_name(executor.binary_name(), target).green()
    );
    println!();
}

/// Matching provisioning rules, flagged when this host will skip them
fn provision_summary(
    target: &TargetSpec,
    manifest: &PipelineManifest,
    host: Option<HostPlatform>,
) -> Option<String> {
    let rules: Vec<String> = manifest
        .provision
        .iter()
        .filter(|rule| rule.applies_to(target))
        .map(|rule| format!("{} ({})", rule.name, rule.packages.join(", ")))
        .collect();

    if rules.is_empty() {
        return None;
    }
    let summary = rules.join("; ");
    if host == Some(target.host_platform) {
        Some(summary)
    } else {
        Some(format!("{} [skipped: not a {} host]", summary, target.host_platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipwright_core::domain::target::TargetRegistry;

    fn target(triple: &str) -> TargetSpec {
        TargetRegistry::default().get(triple).unwrap().clone()
    }

    #[test]
    fn test_provision_summary() {
        let manifest = PipelineManifest::default();
        let linux = target("x86_64-unknown-linux-musl");

        assert_eq!(
            provision_summary(&linux, &manifest, Some(HostPlatform::Linux)).as_deref(),
            Some("linux-audio (libasound2-dev, libasound2)")
        );
        assert!(
            provision_summary(&linux, &manifest, Some(HostPlatform::Macos))
                .unwrap()
                .contains("skipped")
        );
        assert_eq!(
            provision_summary(&target("x86_64-apple-darwin"), &manifest, None),
            None
        );
    }
}
