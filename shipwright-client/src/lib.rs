//! Shipwright HTTP Client
//!
//! A small, type-safe client for the release host's asset-upload endpoint.
//!
//! The upload credential is handed to the client when it is constructed; the
//! client never reads it from the environment itself.
//!
//! # Example
//!
//! ```no_run
//! use shipwright_client::ReleaseClient;
//! use shipwright_core::dto::asset::AssetUploadRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ReleaseClient::new("ghp_example");
//!
//!     let asset = client
//!         .upload_asset(AssetUploadRequest::binary(
//!             "https://uploads.github.com/repos/o/r/releases/1/assets",
//!             "nebulizer-x86_64-apple-darwin",
//!             std::fs::read("target/release/nebulizer")?,
//!         ))
//!         .await?;
//!
//!     println!("Uploaded asset {}", asset.name);
//!     Ok(())
//! }
//! ```

pub mod error;
mod assets;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// User agent sent with every request; the release host rejects requests without one
pub const USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the release host
#[derive(Clone)]
pub struct ReleaseClient {
    /// Bearer credential for the upload endpoint
    token: String,
    /// HTTP client instance
    client: Client,
}

impl ReleaseClient {
    /// Create a new release client authenticated with `token`
    ///
    /// # Example
    /// ```
    /// use shipwright_client::ReleaseClient;
    ///
    /// let client = ReleaseClient::new("ghp_example");
    /// assert!(client.has_token());
    /// ```
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Create a new release client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use shipwright_client::ReleaseClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(300))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = ReleaseClient::with_client("ghp_example", http_client);
    /// ```
    pub fn with_client(token: impl Into<String>, client: Client) -> Self {
        Self {
            token: token.into(),
            client,
        }
    }

    /// Create a release client whose requests fail after `timeout`
    ///
    /// The timeout covers the whole request, body upload included, so a
    /// stalled endpoint surfaces as [`ClientError::RequestFailed`].
    pub fn with_timeout(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(token, client))
    }

    /// Whether a non-empty credential was supplied
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Checks the status code and returns an error carrying the response body
    /// if the request failed, or deserializes the body if it succeeded.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

impl std::fmt::Debug for ReleaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseClient")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ReleaseClient::new("secret");
        assert!(client.has_token());
        assert!(!ReleaseClient::new("  ").has_token());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = ReleaseClient::with_client("secret", Client::new());
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }
}
