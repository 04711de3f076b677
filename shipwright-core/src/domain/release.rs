//! Release domain types

use serde::{Deserialize, Serialize};

/// A tagged release that build artifacts are attached to
///
/// Owned by the hosting service; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag: Option<String>,
    /// Asset upload URL, possibly an RFC 6570 template (`.../assets{?name,label}`)
    pub upload_url: String,
}

impl Release {
    pub fn new(id: u64, upload_url: impl Into<String>) -> Self {
        Self {
            id,
            tag: None,
            upload_url: upload_url.into(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Upload endpoint with any URI-template suffix removed
    pub fn upload_endpoint(&self) -> &str {
        match self.upload_url.find('{') {
            Some(idx) => &self.upload_url[..idx],
            None => &self.upload_url,
        }
    }

    /// Short label used in logs and reports
    pub fn label(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{} (#{})", tag, self.id),
            None => format!("#{}", self.id),
        }
    }
}
