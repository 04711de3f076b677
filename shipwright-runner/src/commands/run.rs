//! Run command handler
//!
//! Resolves the release to publish to, assembles the stage services and runs
//! every job of the matrix. Exits non-zero when any job failed.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use shipwright_client::ReleaseClient;
use shipwright_core::domain::job::{JobOutcome, PipelineReport};
use shipwright_core::domain::release::Release;
use shipwright_core::domain::target::HostPlatform;
use shipwright_core::dto::event::ReleaseEvent;
use shipwright_core::manifest::PipelineManifest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::MatrixArgs;
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::process;
use crate::scheduler::{JobPipeline, Orchestrator};
use crate::service::{
    BuildExecutor, CargoBuild, Provisioner, Publisher, RustupToolchain, SystemPackageManager,
    ToolchainInstaller,
};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Release event payload that triggered the run
    #[arg(long, env = "GITHUB_EVENT_PATH", value_name = "PATH")]
    pub event: Option<PathBuf>,

    /// Release id, instead of reading an event payload
    #[arg(long, requires = "upload_url")]
    pub release_id: Option<u64>,

    /// Asset upload URL of the release (URI-template suffix allowed)
    #[arg(long, requires = "release_id")]
    pub upload_url: Option<String>,

    /// Release tag, used for display only
    #[arg(long, requires = "release_id")]
    pub tag: Option<String>,

    #[command(flatten)]
    pub matrix: MatrixArgs,

    /// Max jobs running at once (unbounded by default)
    #[arg(long)]
    pub max_parallel_jobs: Option<usize>,

    /// Cancel all in-flight jobs after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Fail an asset upload that takes longer than this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub upload_timeout: Option<u64>,
}

impl RunArgs {
    /// Release named on the command line, or carried by the event payload
    fn release(&self) -> Result<Release> {
        if let (Some(id), Some(url)) = (self.release_id, &self.upload_url) {
            let mut release = Release::new(id, url.clone());
            if let Some(tag) = &self.tag {
                release = release.with_tag(tag.clone());
            }
            return Ok(release);
        }

        match &self.event {
            Some(path) => read_event(path),
            None => anyhow::bail!(
                "No release given: pass --event (or set GITHUB_EVENT_PATH) or --release-id with --upload-url"
            ),
        }
    }
}

fn read_event(path: &Path) -> Result<Release> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read release event {}", path.display()))?;
    let event: ReleaseEvent = serde_json::from_str(&source)
        .with_context(|| format!("Failed to parse release event {}", path.display()))?;
    Ok(event.into_release()?)
}

/// Handle the run command
pub async fn handle_run(args: RunArgs, mut config: Config) -> Result<()> {
    if let Some(max) = args.max_parallel_jobs {
        config.max_parallel_jobs = Some(max);
    }
    if let Some(seconds) = args.timeout {
        config.pipeline_timeout = Some(Duration::from_secs(seconds));
    }
    if let Some(seconds) = args.upload_timeout {
        config.upload_timeout = Duration::from_secs(seconds);
    }
    config.validate()?;

    let release = args.release()?;
    let (manifest, registry) = args.matrix.resolve(&config)?;
    let token = config
        .token
        .clone()
        .context("No release credential: set GITHUB_TOKEN or SHIPWRIGHT_TOKEN")?;
    info!(
        "Publishing {} target(s) of {} to release {}",
        registry.len(),
        manifest.project,
        release.label()
    );

    if !registry.is_empty() {
        for tool in [&config.cargo, &config.rustup] {
            process::check_tool_available(tool).await?;
        }
    }

    let client = ReleaseClient::with_timeout(token, config.upload_timeout)
        .context("Failed to create the release client")?;
    let pipeline = build_pipeline(&config, &manifest, client)?;

    let cancel = CancelSignal::new();
    let _ctrl_c = cancel.cancel_on_ctrl_c();
    let _timeout = config
        .pipeline_timeout
        .map(|timeout| cancel.cancel_after(timeout));

    let mut orchestrator = Orchestrator::new(
        registry,
        Arc::new(pipeline),
        config.workspace_base.clone(),
        cancel,
    );
    if let Some(max) = config.max_parallel_jobs {
        orchestrator = orchestrator.with_max_parallel_jobs(max);
    }

    let report = orchestrator.run(release).await;
    print_report(&report);

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{} of {} job(s) failed", failed, report.results.len());
    }
    Ok(())
}

/// Wires the system collaborators into the per-job stage services
fn build_pipeline(
    config: &Config,
    manifest: &PipelineManifest,
    client: ReleaseClient,
) -> Result<JobPipeline> {
    let host = HostPlatform::current().context("Unsupported host operating system")?;
    if !config.use_sudo {
        warn!("Package installs will run without sudo");
    }

    Ok(JobPipeline {
        provisioner: Provisioner::new(
            manifest.provision.clone(),
            Arc::new(SystemPackageManager::new(host, config.use_sudo)),
            host,
        ),
        installer: ToolchainInstaller::new(Arc::new(RustupToolchain::new(&config.rustup))),
        executor: BuildExecutor::new(
            Arc::new(CargoBuild::new(
                &config.cargo,
                config.source_dir.clone(),
                &manifest.toolchain,
            )),
            &manifest.project,
        ),
        publisher: Publisher::new(Arc::new(client), &manifest.project),
        toolchain: manifest.toolchain.clone(),
    })
}

fn print_report(report: &PipelineReport) {
    println!();
    if report.results.is_empty() {
        println!("{}", "No targets to build.".yellow());
        return;
    }

    for result in &report.results {
        match &result.outcome {
            JobOutcome::Published { asset } => println!(
                "  {} {} {}",
                "✓".green(),
                result.target.triple.bold(),
                asset.name.dimmed()
            ),
            JobOutcome::Failed { stage, cause } => println!(
                "  {} {} failed during {}: {}",
                "✗".red(),
                result.target.triple.bold(),
                stage.to_string().red(),
                cause
            ),
        }
    }

    println!();
    let published = report.published().count();
    let summary = format!(
        "{} published, {} failed",
        published,
        report.results.len() - published
    );
    if report.success() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            event: None,
            release_id: None,
            upload_url: None,
            tag: None,
            matrix: MatrixArgs::default(),
            max_parallel_jobs: None,
            timeout: None,
            upload_timeout: None,
        }
    }

    #[test]
    fn test_explicit_release_wins_over_event() {
        let args = RunArgs {
            event: Some("/nonexistent/event.json".into()),
            release_id: Some(7),
            upload_url: Some("https://uploads.example.invalid/releases/7/assets".to_string()),
            tag: Some("v1.0.0".to_string()),
            ..args()
        };

        let release = args.release().unwrap();
        assert_eq!(release.id, 7);
        assert_eq!(release.label(), "v1.0.0 (#7)");
    }

    #[test]
    fn test_release_from_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(
            &path,
            r#"{"action": "created", "release": {"id": 9, "tag_name": "v0.9.0",
                "upload_url": "https://uploads.example.invalid/releases/9/assets{?name,label}"}}"#,
        )
        .unwrap();

        let release = RunArgs {
            event: Some(path),
            ..args()
        }
        .release()
        .unwrap();

        assert_eq!(release.id, 9);
        assert_eq!(
            release.upload_endpoint(),
            "https://uploads.example.invalid/releases/9/assets"
        );
    }

    #[test]
    fn test_missing_release_is_error() {
        assert!(args().release().is_err());
    }

    #[test]
    fn test_build_pipeline_uses_manifest() {
        let manifest = PipelineManifest::default();
        let pipeline =
            build_pipeline(&Config::default(), &manifest, ReleaseClient::new("token")).unwrap();

        assert_eq!(pipeline.toolchain, "stable");
        assert_eq!(pipeline.executor.binary_name(), "nebulizer");
    }

    #[tokio::test]
    async fn test_stalled_upload_fails_publish_within_timeout() {
        use crate::service::ToolchainInstaller;
        use crate::testing::{FakeBuild, FakePackageManager, FakeToolchain};
        use shipwright_core::domain::job::JobStage;
        use shipwright_core::domain::target::TargetRegistry;
        use std::time::Instant;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const LINUX: &str = "x86_64-unknown-linux-musl";

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": 1, "name": "late"}))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let client = ReleaseClient::with_timeout("token", Duration::from_millis(300)).unwrap();
        let pipeline = JobPipeline {
            provisioner: Provisioner::new(
                Vec::new(),
                Arc::new(FakePackageManager::default()),
                HostPlatform::Linux,
            ),
            installer: ToolchainInstaller::new(Arc::new(FakeToolchain::default())),
            executor: BuildExecutor::new(Arc::new(FakeBuild::new("nebulizer")), "nebulizer"),
            publisher: Publisher::new(Arc::new(client), "nebulizer"),
            toolchain: "stable".to_string(),
        };

        let registry = TargetRegistry::default()
            .select(&[LINUX.to_string()])
            .unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            registry,
            Arc::new(pipeline),
            workspace.path().to_path_buf(),
            CancelSignal::new(),
        );
        let release = Release::new(1, format!("{}/releases/1/assets{{?name,label}}", server.uri()));

        let started = Instant::now();
        let report = orchestrator.run(release).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].failed_stage(), Some(JobStage::Publish));
        match &report.results[0].outcome {
            JobOutcome::Failed { cause, .. } => assert!(cause.contains("upload failed")),
            other => panic!("expected a failed upload, got {:?}", other),
        }
    }
}
