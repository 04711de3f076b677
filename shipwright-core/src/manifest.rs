//! Pipeline manifest
//!
//! The manifest is the declarative build matrix: which project binary to
//! build, which toolchain to pin, which targets to build for, and which
//! host packages to provision for which targets. Every field is optional and
//! falls back to the stock release configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::provision::ProvisionRule;
use crate::domain::target::{RegistryError, TargetRegistry, TargetSpec};

/// Binary name of the project built by the stock manifest
pub const DEFAULT_PROJECT: &str = "nebulizer";

/// Toolchain pinned by the stock manifest
pub const DEFAULT_TOOLCHAIN: &str = "stable";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid target matrix: {0}")]
    Registry(#[from] RegistryError),

    #[error("manifest field '{0}' cannot be empty")]
    EmptyField(&'static str),
}

/// Declarative build matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineManifest {
    /// Name of the binary the project's release build produces
    pub project: String,
    /// Pinned toolchain version (e.g. `stable`, `1.79.0`)
    pub toolchain: String,
    pub targets: Vec<TargetSpec>,
    pub provision: Vec<ProvisionRule>,
}

impl Default for PipelineManifest {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            toolchain: DEFAULT_TOOLCHAIN.to_string(),
            targets: TargetRegistry::default().list_targets().to_vec(),
            provision: vec![ProvisionRule::linux_audio()],
        }
    }
}

impl PipelineManifest {
    /// Parses and validates a JSON manifest
    pub fn from_json(source: &str) -> Result<Self, ManifestError> {
        let manifest: PipelineManifest = serde_json::from_str(source)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.project.trim().is_empty() {
            return Err(ManifestError::EmptyField("project"));
        }
        if self.toolchain.trim().is_empty() {
            return Err(ManifestError::EmptyField("toolchain"));
        }
        TargetRegistry::new(self.targets.clone())?;
        Ok(())
    }

    /// Builds the target registry declared by this manifest
    pub fn registry(&self) -> Result<TargetRegistry, ManifestError> {
        Ok(TargetRegistry::new(self.targets.clone())?)
    }
}
