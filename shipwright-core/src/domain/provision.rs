//! Provisioning rule types
//!
//! A provisioning rule pairs a predicate over a [`TargetSpec`] with a list of
//! system packages that must be installed on the host before building that
//! target. Rules are data so new platform-conditioned steps can be declared
//! in the manifest without touching the orchestration code.

use serde::{Deserialize, Serialize};

use crate::domain::target::{HostPlatform, TargetSpec};

/// Condition evaluated against a target to decide whether a rule applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPredicate {
    /// Matches every target
    Always,
    /// Matches when the triple contains the given substring
    TripleContains(String),
    /// Matches when the target is built on the given host platform
    HostIs(HostPlatform),
    /// Matches when every inner predicate matches
    All(Vec<TargetPredicate>),
    /// Matches when at least one inner predicate matches
    Any(Vec<TargetPredicate>),
}

impl TargetPredicate {
    pub fn matches(&self, target: &TargetSpec) -> bool {
        match self {
            TargetPredicate::Always => true,
            TargetPredicate::TripleContains(needle) => target.triple.contains(needle.as_str()),
            TargetPredicate::HostIs(platform) => target.host_platform == *platform,
            TargetPredicate::All(inner) => inner.iter().all(|p| p.matches(target)),
            TargetPredicate::Any(inner) => inner.iter().any(|p| p.matches(target)),
        }
    }
}

/// Packages to install when a predicate holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRule {
    /// Human-readable name used in logs
    pub name: String,
    pub when: TargetPredicate,
    pub packages: Vec<String>,
}

impl ProvisionRule {
    pub fn new(name: impl Into<String>, when: TargetPredicate, packages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            when,
            packages,
        }
    }

    /// The ALSA development headers and runtime needed to link audio on Linux
    pub fn linux_audio() -> Self {
        Self::new(
            "linux-audio",
            TargetPredicate::TripleContains("linux".to_string()),
            vec!["libasound2-dev".to_string(), "libasound2".to_string()],
        )
    }

    pub fn applies_to(&self, target: &TargetSpec) -> bool {
        self.when.matches(target)
    }
}
