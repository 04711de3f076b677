//! Toolchain service
//!
//! Makes sure the pinned compiler toolchain is installed with support for
//! the job's target triple, including cross targets whose native platform
//! differs from the host.

use anyhow::Result;
use async_trait::async_trait;
use shipwright_core::domain::target::HostPlatform;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::JobError;
use crate::process;

/// Collaborator that installs (or no-ops on) a toolchain plus target support
#[async_trait]
pub trait ToolchainManager: Send + Sync {
    /// Ensures `version` is installed with the standard library for `triple`
    ///
    /// Must be idempotent: calling it again with the same arguments succeeds
    /// and leaves the host unchanged.
    async fn ensure(&self, version: &str, triple: &str) -> Result<()>;
}

/// Toolchain manager backed by `rustup`
pub struct RustupToolchain {
    rustup: String,
    /// rustup does not tolerate concurrent installs into the same home
    lock: Mutex<()>,
}

impl RustupToolchain {
    pub fn new(rustup: impl Into<String>) -> Self {
        Self {
            rustup: rustup.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ToolchainManager for RustupToolchain {
    async fn ensure(&self, version: &str, triple: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        // `toolchain install` is a no-op for components that are already present
        let mut command = Command::new(&self.rustup);
        command
            .arg("toolchain")
            .arg("install")
            .arg(version)
            .arg("--profile")
            .arg("minimal")
            .arg("--no-self-update")
            .arg("--target")
            .arg(triple);
        process::run(command, "rustup toolchain install").await?;

        Ok(())
    }
}

/// Prepares the pinned toolchain for a job
pub struct ToolchainInstaller {
    manager: Arc<dyn ToolchainManager>,
}

impl ToolchainInstaller {
    pub fn new(manager: Arc<dyn ToolchainManager>) -> Self {
        Self { manager }
    }

    /// Installs `version` with support for `triple` on a `host` machine
    pub async fn install(
        &self,
        host: HostPlatform,
        triple: &str,
        version: &str,
    ) -> Result<(), JobError> {
        if let Some(current) = HostPlatform::current() {
            if current != host {
                warn!(
                    "{} is normally built on {} but this host is {}; cross-compiling",
                    triple, host, current
                );
            }
        }

        info!("Ensuring toolchain {} with target {}", version, triple);

        self.manager
            .ensure(version, triple)
            .await
            .map_err(|source| JobError::Toolchain {
                triple: triple.to_string(),
                source,
            })
    }
}
