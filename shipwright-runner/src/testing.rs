//! In-memory collaborators for tests

use anyhow::Result;
use async_trait::async_trait;
use shipwright_core::dto::asset::{AssetUploadRequest, UploadedAsset};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::service::{AssetUploader, BuildBackend, PackageManager, ToolchainManager};

#[derive(Default)]
pub struct FakePackageManager {
    fail: bool,
    installs: Mutex<Vec<Vec<String>>>,
}

impl FakePackageManager {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Every install attempt, including failed ones
    pub fn installs(&self) -> Vec<Vec<String>> {
        self.installs.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn install(&self, packages: &[String]) -> Result<()> {
        self.installs.lock().unwrap().push(packages.to_vec());
        if self.fail {
            anyhow::bail!("unable to locate package {}", packages.join(" "));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeToolchain {
    fail_for: Option<String>,
    calls: AtomicUsize,
    installed: Mutex<BTreeSet<(String, String)>>,
}

impl FakeToolchain {
    pub fn failing_for(triple: &str) -> Self {
        Self {
            fail_for: Some(triple.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn installed(&self) -> BTreeSet<(String, String)> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolchainManager for FakeToolchain {
    async fn ensure(&self, version: &str, triple: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.as_deref() == Some(triple) {
            anyhow::bail!("toolchain '{}' does not support target '{}'", version, triple);
        }
        self.installed
            .lock()
            .unwrap()
            .insert((version.to_string(), triple.to_string()));
        Ok(())
    }
}

/// Build backend that writes the triple as the binary's contents
pub struct FakeBuild {
    binary_name: String,
    write_artifacts: bool,
    fail_for: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeBuild {
    pub fn new(binary_name: &str) -> Self {
        Self {
            binary_name: binary_name.to_string(),
            write_artifacts: true,
            fail_for: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Builds "succeed" without producing a binary
    pub fn without_artifacts(mut self) -> Self {
        self.write_artifacts = false;
        self
    }

    pub fn failing_for(mut self, triple: &str) -> Self {
        self.fail_for = Some(triple.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(triple, output_dir)` of every build started
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildBackend for FakeBuild {
    async fn build(&self, triple: &str, output_dir: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((triple.to_string(), output_dir.to_path_buf()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_for.as_deref() == Some(triple) {
            anyhow::bail!("linking with `cc` failed for {}", triple);
        }
        if self.write_artifacts {
            let extension = if triple.contains("windows") { ".exe" } else { "" };
            let dir = output_dir.join(triple).join("release");
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(
                dir.join(format!("{}{}", self.binary_name, extension)),
                triple.as_bytes(),
            )
            .await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUploader {
    reject: Option<String>,
    attempts: AtomicUsize,
    uploads: Mutex<Vec<AssetUploadRequest>>,
}

impl FakeUploader {
    pub fn rejecting(asset_name: &str) -> Self {
        Self {
            reject: Some(asset_name.to_string()),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Accepted uploads
    pub fn uploads(&self) -> Vec<AssetUploadRequest> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn uploaded_names(&self) -> BTreeSet<String> {
        self.uploads()
            .into_iter()
            .map(|request| request.asset_name)
            .collect()
    }
}

#[async_trait]
impl AssetUploader for FakeUploader {
    async fn upload(&self, request: AssetUploadRequest) -> Result<UploadedAsset> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject.as_deref() == Some(request.asset_name.as_str()) {
            anyhow::bail!("API error (status 422): already_exists");
        }

        let asset = UploadedAsset {
            id: attempt as u64,
            name: request.asset_name.clone(),
            size: request.payload.len() as u64,
            browser_download_url: None,
        };
        self.uploads.lock().unwrap().push(request);
        Ok(asset)
    }
}
