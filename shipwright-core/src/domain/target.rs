//! Build target domain types
//!
//! A [`TargetSpec`] is one row of the build matrix. The [`TargetRegistry`]
//! holds the ordered matrix and guarantees that no two rows share a triple,
//! which is what keeps published asset names unique.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Platform a job's host environment runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    Windows,
    Linux,
    Macos,
}

impl HostPlatform {
    /// Platform of the machine this process is running on, if supported
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            _ => None,
        }
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostPlatform::Windows => write!(f, "windows"),
            HostPlatform::Linux => write!(f, "linux"),
            HostPlatform::Macos => write!(f, "macos"),
        }
    }
}

/// One entry of the build matrix
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Compilation target triple, e.g. `x86_64-unknown-linux-musl`
    pub triple: String,
    /// Platform of the host that builds this target
    pub host_platform: HostPlatform,
    /// Suffix of the produced binary (`.exe` on Windows, empty elsewhere)
    #[serde(default)]
    pub file_extension: String,
}

impl TargetSpec {
    pub fn new(
        triple: impl Into<String>,
        host_platform: HostPlatform,
        file_extension: impl Into<String>,
    ) -> Self {
        Self {
            triple: triple.into(),
            host_platform,
            file_extension: file_extension.into(),
        }
    }

    /// File name of the built binary for this target
    pub fn binary_file_name(&self, binary_name: &str) -> String {
        format!("{}{}", binary_name, self.file_extension)
    }

    /// Public name of the release asset for this target
    pub fn asset_name(&self, binary_name: &str) -> String {
        asset_name(binary_name, self)
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.triple, self.host_platform)
    }
}

/// Composes the asset name `<binary>-<triple><extension>`
pub fn asset_name(binary_name: &str, target: &TargetSpec) -> String {
    format!("{}-{}{}", binary_name, target.triple, target.file_extension)
}

/// Errors raised while building a registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("target triple '{0}' is declared more than once")]
    DuplicateTriple(String),

    #[error("target triple cannot be empty")]
    EmptyTriple,

    #[error("unknown target triple '{0}'")]
    UnknownTriple(String),
}

/// Ordered, immutable build matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRegistry {
    targets: Vec<TargetSpec>,
}

impl TargetRegistry {
    /// Creates a registry, rejecting empty or duplicate triples
    pub fn new(targets: Vec<TargetSpec>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for target in &targets {
            if target.triple.trim().is_empty() {
                return Err(RegistryError::EmptyTriple);
            }
            if !seen.insert(target.triple.as_str()) {
                return Err(RegistryError::DuplicateTriple(target.triple.clone()));
            }
        }
        Ok(Self { targets })
    }

    /// Targets in declaration order
    pub fn list_targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, triple: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.triple == triple)
    }

    /// Narrows the registry to the given triples, keeping declaration order
    pub fn select(&self, triples: &[String]) -> Result<Self, RegistryError> {
        if let Some(unknown) = triples.iter().find(|t| self.get(t).is_none()) {
            return Err(RegistryError::UnknownTriple(unknown.clone()));
        }
        Ok(Self {
            targets: self
                .targets
                .iter()
                .filter(|t| triples.contains(&t.triple))
                .cloned()
                .collect(),
        })
    }

    /// Narrows the registry to targets built on the given host platform
    pub fn for_host(&self, platform: HostPlatform) -> Self {
        Self {
            targets: self
                .targets
                .iter()
                .filter(|t| t.host_platform == platform)
                .cloned()
                .collect(),
        }
    }
}

impl Default for TargetRegistry {
    /// The stock release matrix: Windows (GNU), static Linux (musl) and macOS
    fn default() -> Self {
        Self {
            targets: vec![
                TargetSpec::new("x86_64-pc-windows-gnu", HostPlatform::Windows, ".exe"),
                TargetSpec::new("x86_64-unknown-linux-musl", HostPlatform::Linux, ""),
                TargetSpec::new("x86_64-apple-darwin", HostPlatform::Macos, ""),
            ],
        }
    }
}
