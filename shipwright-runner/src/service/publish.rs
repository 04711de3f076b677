//! Publish service
//!
//! Names the built binary after its target, reads it and uploads it to the
//! release. The uploader is injected, which keeps the credential out of
//! global state and lets tests swap in a fake.

use anyhow::{Context, Result};
use async_trait::async_trait;
use shipwright_client::ReleaseClient;
use shipwright_core::domain::job::BuildArtifact;
use shipwright_core::domain::release::Release;
use shipwright_core::domain::target::TargetSpec;
use shipwright_core::dto::asset::{AssetUploadRequest, UploadedAsset};
use std::sync::Arc;
use tracing::info;

use crate::error::JobError;

/// Collaborator that attaches an asset to a release
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, request: AssetUploadRequest) -> Result<UploadedAsset>;
}

#[async_trait]
impl AssetUploader for ReleaseClient {
    async fn upload(&self, request: AssetUploadRequest) -> Result<UploadedAsset> {
        Ok(self.upload_asset(request).await?)
    }
}

/// Uploads job artifacts to their release
pub struct Publisher {
    uploader: Arc<dyn AssetUploader>,
    binary_name: String,
}

impl Publisher {
    pub fn new(uploader: Arc<dyn AssetUploader>, binary_name: impl Into<String>) -> Self {
        Self {
            uploader,
            binary_name: binary_name.into(),
        }
    }

    /// Public asset name for `target`
    pub fn asset_name(&self, target: &TargetSpec) -> String {
        target.asset_name(&self.binary_name)
    }

    /// Reads the artifact and builds the upload request for it
    pub async fn prepare(
        &self,
        release: &Release,
        target: &TargetSpec,
        artifact: &BuildArtifact,
    ) -> Result<AssetUploadRequest> {
        let payload = tokio::fs::read(&artifact.path)
            .await
            .with_context(|| format!("Failed to read artifact {}", artifact.path.display()))?;

        Ok(AssetUploadRequest::binary(
            release.upload_endpoint(),
            self.asset_name(target),
            payload,
        ))
    }

    /// Uploads the artifact of `target` to `release`
    ///
    /// Exactly one upload attempt is made; a rejection is returned to the job.
    pub async fn publish(
        &self,
        release: &Release,
        target: &TargetSpec,
        artifact: &BuildArtifact,
    ) -> Result<UploadedAsset, JobError> {
        let upload_error = |source: anyhow::Error| JobError::Upload {
            triple: target.triple.clone(),
            source,
        };

        let request = self
            .prepare(release, target, artifact)
            .await
            .map_err(upload_error)?;

        info!(
            "Uploading {} ({} bytes) to release {}",
            request.asset_name,
            request.payload.len(),
            release.label()
        );

        let asset = self.uploader.upload(request).await.map_err(upload_error)?;

        info!("Published {} as asset {}", asset.name, asset.id);
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeUploader;
    use shipwright_core::domain::job::JobStage;
    use shipwright_core::domain::target::TargetRegistry;

    fn release() -> Release {
        Release::new(
            3,
            "https://uploads.example.invalid/releases/3/assets{?name,label}",
        )
    }

    fn artifact_in(dir: &std::path::Path, target: &TargetSpec, bytes: &[u8]) -> BuildArtifact {
        let path = dir.join("bin");
        std::fs::write(&path, bytes).unwrap();
        BuildArtifact {
            path,
            target: target.clone(),
        }
    }

    #[tokio::test]
    async fn test_publish_names_and_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let target = TargetRegistry::default()
            .get("x86_64-pc-windows-gnu")
            .unwrap()
            .clone();
        let uploader = Arc::new(FakeUploader::default());
        let publisher = Publisher::new(uploader.clone(), "nebulizer");

        let artifact = artifact_in(dir.path(), &target, b"MZ");
        let asset = publisher
            .publish(&release(), &target, &artifact)
            .await
            .unwrap();

        assert_eq!(asset.name, "nebulizer-x86_64-pc-windows-gnu.exe");
        let uploads = uploader.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(
            uploads[0].upload_endpoint,
            "https://uploads.example.invalid/releases/3/assets"
        );
        assert_eq!(uploads[0].content_type, "application/octet-stream");
        assert_eq!(uploads[0].payload, b"MZ".to_vec());
    }

    #[tokio::test]
    async fn test_rejected_upload_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let target = TargetRegistry::default()
            .get("x86_64-apple-darwin")
            .unwrap()
            .clone();
        let uploader = Arc::new(FakeUploader::rejecting("nebulizer-x86_64-apple-darwin"));
        let publisher = Publisher::new(uploader.clone(), "nebulizer");

        let artifact = artifact_in(dir.path(), &target, b"\xcf\xfa\xed\xfe");
        let err = publisher
            .publish(&release(), &target, &artifact)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), JobStage::Publish);
        assert_eq!(uploader.attempts(), 1);
        assert!(uploader.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_artifact_is_upload_error() {
        let target = TargetRegistry::default()
            .get("x86_64-apple-darwin")
            .unwrap()
            .clone();
        let uploader = Arc::new(FakeUploader::default());
        let publisher = Publisher::new(uploader.clone(), "nebulizer");

        let artifact = BuildArtifact {
            path: "/nonexistent/shipwright/nebulizer".into(),
            target: target.clone(),
        };
        let err = publisher
            .publish(&release(), &target, &artifact)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), JobStage::Publish);
        assert_eq!(uploader.attempts(), 0);
    }
}
