//! Release asset endpoints

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use shipwright_core::dto::asset::{AssetUploadRequest, UploadedAsset};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{ReleaseClient, USER_AGENT};

impl ReleaseClient {
    // =============================================================================
    // Asset Upload
    // =============================================================================

    /// Upload a binary asset to a release
    ///
    /// Issues `POST {upload_endpoint}?name={asset_name}` with the payload as
    /// the raw request body. The upload is attempted exactly once.
    ///
    /// # Arguments
    /// * `req` - The asset upload request
    ///
    /// # Returns
    /// The asset as recorded by the release host
    pub async fn upload_asset(&self, req: AssetUploadRequest) -> Result<UploadedAsset> {
        if req.asset_name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "asset name cannot be empty".to_string(),
            ));
        }

        debug!(
            "Uploading {} ({} bytes) to {}",
            req.asset_name,
            req.payload.len(),
            req.upload_endpoint
        );

        let response = self
            .client
            .post(&req.upload_endpoint)
            .query(&[("name", req.asset_name.as_str())])
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(CONTENT_TYPE, req.content_type.as_str())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .body(req.payload)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
