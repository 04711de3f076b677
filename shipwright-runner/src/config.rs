//! Runner configuration
//!
//! Defines the settings shared by every job of a pipeline run: where the
//! project lives, where job outputs go, how many jobs may run at once, and
//! which credential and executables to use.

use anyhow::{Context, Result};
use shipwright_core::manifest::PipelineManifest;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Manifest picked up from the source directory when none is given
pub const DEFAULT_MANIFEST: &str = "shipwright.json";

/// Bound on a single asset upload
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Runner configuration
#[derive(Clone)]
pub struct Config {
    /// Explicit manifest path; `shipwright.json` in the source dir is used otherwise
    pub manifest_path: Option<PathBuf>,

    /// Project checkout, shared read-only by all jobs
    pub source_dir: PathBuf,

    /// Root under which each job gets `<release id>/<triple>`
    pub workspace_base: PathBuf,

    /// Max jobs running at once; `None` runs every job concurrently
    pub max_parallel_jobs: Option<usize>,

    /// Cancels all in-flight jobs once elapsed
    pub pipeline_timeout: Option<Duration>,

    /// Fails an upload that has not completed in time
    pub upload_timeout: Duration,

    /// Release API credential
    pub token: Option<String>,

    /// Prefix Linux package installs with `sudo`
    pub use_sudo: bool,

    pub cargo: String,
    pub rustup: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("manifest_path", &self.manifest_path)
            .field("source_dir", &self.source_dir)
            .field("workspace_base", &self.workspace_base)
            .field("max_parallel_jobs", &self.max_parallel_jobs)
            .field("pipeline_timeout", &self.pipeline_timeout)
            .field("upload_timeout", &self.upload_timeout)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("use_sudo", &self.use_sudo)
            .field("cargo", &self.cargo)
            .field("rustup", &self.rustup)
            .finish()
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognised variables (all optional):
    /// - SHIPWRIGHT_MANIFEST
    /// - SHIPWRIGHT_SOURCE_DIR (default: .)
    /// - SHIPWRIGHT_WORKSPACE (default: target/shipwright)
    /// - SHIPWRIGHT_MAX_PARALLEL_JOBS (default: unbounded)
    /// - SHIPWRIGHT_TIMEOUT (seconds, default: none)
    /// - SHIPWRIGHT_UPLOAD_TIMEOUT (seconds, default: 600)
    /// - SHIPWRIGHT_TOKEN, falling back to GITHUB_TOKEN
    /// - SHIPWRIGHT_USE_SUDO (default: true)
    /// - SHIPWRIGHT_CARGO / SHIPWRIGHT_RUSTUP (default: cargo / rustup)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let max_parallel_jobs = var("SHIPWRIGHT_MAX_PARALLEL_JOBS")
            .map(|s| s.parse::<usize>())
            .transpose()
            .context("SHIPWRIGHT_MAX_PARALLEL_JOBS must be a positive integer")?;

        let pipeline_timeout = var("SHIPWRIGHT_TIMEOUT")
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("SHIPWRIGHT_TIMEOUT must be a number of seconds")?
            .map(Duration::from_secs);

        let upload_timeout = var("SHIPWRIGHT_UPLOAD_TIMEOUT")
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("SHIPWRIGHT_UPLOAD_TIMEOUT must be a number of seconds")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.upload_timeout);

        let use_sudo = match var("SHIPWRIGHT_USE_SUDO") {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("SHIPWRIGHT_USE_SUDO: invalid value '{}'", value))?,
            None => defaults.use_sudo,
        };

        Ok(Self {
            manifest_path: var("SHIPWRIGHT_MANIFEST").map(PathBuf::from),
            source_dir: var("SHIPWRIGHT_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_dir),
            workspace_base: var("SHIPWRIGHT_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_base),
            max_parallel_jobs,
            pipeline_timeout,
            upload_timeout,
            token: var("SHIPWRIGHT_TOKEN").or_else(|| var("GITHUB_TOKEN")),
            use_sudo,
            cargo: var("SHIPWRIGHT_CARGO").unwrap_or(defaults.cargo),
            rustup: var("SHIPWRIGHT_RUSTUP").unwrap_or(defaults.rustup),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_jobs == Some(0) {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.pipeline_timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("pipeline_timeout must be greater than 0");
        }

        if self.upload_timeout.is_zero() {
            anyhow::bail!("upload_timeout must be greater than 0");
        }

        if self.workspace_base.as_os_str().is_empty() {
            anyhow::bail!("workspace_base cannot be empty");
        }

        if self.cargo.is_empty() || self.rustup.is_empty() {
            anyhow::bail!("cargo and rustup executables cannot be empty");
        }

        Ok(())
    }

    /// Loads the pipeline manifest
    ///
    /// An explicit path must exist. Without one, `shipwright.json` in the
    /// source directory is used when present and the stock manifest otherwise.
    pub fn load_manifest(&self) -> Result<PipelineManifest> {
        let path = match &self.manifest_path {
            Some(path) => path.clone(),
            None => {
                let candidate = self.source_dir.join(DEFAULT_MANIFEST);
                if !candidate.is_file() {
                    info!("No {} found, using the stock release matrix", DEFAULT_MANIFEST);
                    return Ok(PipelineManifest::default());
                }
                candidate
            }
        };

        read_manifest(&path)
    }
}

fn read_manifest(path: &Path) -> Result<PipelineManifest> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let manifest = PipelineManifest::from_json(&source)
        .with_context(|| format!("Invalid manifest {}", path.display()))?;
    info!(
        "Loaded manifest {} ({} target(s))",
        path.display(),
        manifest.targets.len()
    );
    Ok(manifest)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: None,
            source_dir: PathBuf::from("."),
            workspace_base: PathBuf::from("target/shipwright"),
            max_parallel_jobs: None,
            pipeline_timeout: None,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            token: None,
            use_sudo: true,
            cargo: "cargo".to_string(),
            rustup: "rustup".to_string(),
        }
    }
}
