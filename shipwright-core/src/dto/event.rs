//! Release event DTO
//!
//! The pipeline is triggered by a "release created" webhook payload. Only the
//! fields needed to attach assets are modelled; everything else is ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::release::Release;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseEventError {
    #[error("release event action '{0}' does not trigger a build")]
    UnsupportedAction(String),

    #[error("release {0} has no upload url")]
    MissingUploadUrl(u64),
}

/// Inbound release event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub release: ReleasePayload,
}

/// Release object carried by the event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePayload {
    pub id: u64,
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub upload_url: String,
}

impl ReleaseEvent {
    /// Converts the event into the release to publish to
    pub fn into_release(self) -> Result<Release, ReleaseEventError> {
        if let Some(action) = &self.action {
            if action != "created" && action != "published" {
                return Err(ReleaseEventError::UnsupportedAction(action.clone()));
            }
        }

        let payload = self.release;
        if payload.upload_url.trim().is_empty() {
            return Err(ReleaseEventError::MissingUploadUrl(payload.id));
        }

        Ok(Release {
            id: payload.id,
            tag: payload.tag_name,
            upload_url: payload.upload_url,
        })
    }
}
