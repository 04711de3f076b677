//! Asset upload DTOs

use serde::{Deserialize, Serialize};

/// Content type of every uploaded binary
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Upload of one binary to a release
#[derive(Clone, PartialEq, Eq)]
pub struct AssetUploadRequest {
    /// Endpoint the asset is POSTed to (template suffix already stripped)
    pub upload_endpoint: String,
    pub asset_name: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl AssetUploadRequest {
    /// Creates an `application/octet-stream` upload
    pub fn binary(
        upload_endpoint: impl Into<String>,
        asset_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            upload_endpoint: upload_endpoint.into(),
            asset_name: asset_name.into(),
            content_type: OCTET_STREAM.to_string(),
            payload,
        }
    }
}

// Payloads are whole binaries; keep them out of debug output.
impl std::fmt::Debug for AssetUploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetUploadRequest")
            .field("upload_endpoint", &self.upload_endpoint)
            .field("asset_name", &self.asset_name)
            .field("content_type", &self.content_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Asset as reported back by the release host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub browser_download_url: Option<String>,
}
