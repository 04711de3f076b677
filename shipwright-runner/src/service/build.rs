//! Build service
//!
//! Runs the project's release build for one target into the job's private
//! output directory and locates the produced binary. The binary path is a
//! pure function of the output directory, the triple and the binary name:
//!
//! ```text
//! <output_dir>/<triple>/release/<binary><extension>
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use shipwright_core::domain::job::BuildArtifact;
use shipwright_core::domain::target::TargetSpec;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::JobError;
use crate::process;

/// Collaborator that compiles the project for one target
#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// Builds the project in release mode for `triple`, writing only below `output_dir`
    async fn build(&self, triple: &str, output_dir: &Path) -> Result<()>;
}

/// Build backend that drives `cargo build --release`
pub struct CargoBuild {
    cargo: String,
    source_dir: PathBuf,
    toolchain: String,
}

impl CargoBuild {
    /// Creates a cargo backend
    ///
    /// # Arguments
    /// * `cargo` - Cargo executable (usually the rustup proxy `cargo`)
    /// * `source_dir` - Project checkout, shared read-only between jobs
    /// * `toolchain` - Toolchain passed as `+<toolchain>`
    pub fn new(
        cargo: impl Into<String>,
        source_dir: PathBuf,
        toolchain: impl Into<String>,
    ) -> Self {
        Self {
            cargo: cargo.into(),
            source_dir,
            toolchain: toolchain.into(),
        }
    }
}

#[async_trait]
impl BuildBackend for CargoBuild {
    async fn build(&self, triple: &str, output_dir: &Path) -> Result<()> {
        let mut command = Command::new(&self.cargo);
        command
            .current_dir(&self.source_dir)
            .arg(format!("+{}", self.toolchain))
            .arg("build")
            .arg("--release")
            .arg("--target")
            .arg(triple)
            .arg("--target-dir")
            .arg(output_dir);

        process::run(command, "cargo build").await?;
        Ok(())
    }
}

/// Builds one target and hands back its artifact
pub struct BuildExecutor {
    backend: Arc<dyn BuildBackend>,
    binary_name: String,
}

impl BuildExecutor {
    pub fn new(backend: Arc<dyn BuildBackend>, binary_name: impl Into<String>) -> Self {
        Self {
            backend,
            binary_name: binary_name.into(),
        }
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Path the binary for `target` will have after a successful build
    pub fn artifact_path(&self, target: &TargetSpec, output_dir: &Path) -> PathBuf {
        output_dir
            .join(&target.triple)
            .join("release")
            .join(target.binary_file_name(&self.binary_name))
    }

    /// Builds `target` into `output_dir`
    ///
    /// A stale binary from a previous run is removed first, so an artifact is
    /// only returned when this build produced it.
    pub async fn build(
        &self,
        target: &TargetSpec,
        output_dir: &Path,
    ) -> Result<BuildArtifact, JobError> {
        let path = self.artifact_path(target, output_dir);
        let build_error = |source: anyhow::Error| JobError::Build {
            triple: target.triple.clone(),
            source,
        };

        prepare_output_dir(output_dir, &path)
            .await
            .map_err(build_error)?;

        info!("Building {} into {}", target.triple, output_dir.display());
        self.backend
            .build(&target.triple, output_dir)
            .await
            .map_err(build_error)?;

        let metadata = tokio::fs::metadata(&path).await.ok();
        match metadata {
            Some(meta) if meta.is_file() => {
                debug!("Found artifact {} ({} bytes)", path.display(), meta.len());
                Ok(BuildArtifact {
                    path,
                    target: target.clone(),
                })
            }
            _ => Err(build_error(anyhow::anyhow!(
                "build succeeded but no binary was found at {}",
                path.display()
            ))),
        }
    }
}

async fn prepare_output_dir(output_dir: &Path, artifact: &Path) -> Result<()> {
    tokio::fs::create_dir_all(output_dir).await.with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    match tokio::fs::remove_file(artifact).await {
        Ok(()) => {
            debug!("Removed stale artifact {}", artifact.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e)
            .with_context(|| format!("Failed to remove stale artifact {}", artifact.display())),
    }
}
