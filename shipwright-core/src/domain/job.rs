//! Job domain types
//!
//! A job builds and publishes exactly one target for one release. Its
//! lifecycle is a linear state machine:
//!
//! ```text
//! Pending -> Provisioning -> ToolchainReady -> Built -> Published
//!                 |               |              |
//!                 +---------------+--------------+--> Failed(stage)
//! ```
//!
//! No transition skips a state and terminal states are final.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::release::Release;
use crate::domain::target::TargetSpec;
use crate::dto::asset::UploadedAsset;

/// Pipeline stage a job can fail in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStage {
    Provisioning,
    Toolchain,
    Build,
    Publish,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Provisioning => write!(f, "provisioning"),
            JobStage::Toolchain => write!(f, "toolchain"),
            JobStage::Build => write!(f, "build"),
            JobStage::Publish => write!(f, "publish"),
        }
    }
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Provisioning,
    ToolchainReady,
    Built,
    Published,
    Failed(JobStage),
}

/// Rejected state transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid job transition from {from:?}: {reason}")]
pub struct TransitionError {
    pub from: JobState,
    pub reason: &'static str,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Published | JobState::Failed(_))
    }

    /// Moves to the next state on the success path
    pub fn advance(self) -> Result<JobState, TransitionError> {
        match self {
            JobState::Pending => Ok(JobState::Provisioning),
            JobState::Provisioning => Ok(JobState::ToolchainReady),
            JobState::ToolchainReady => Ok(JobState::Built),
            JobState::Built => Ok(JobState::Published),
            JobState::Published | JobState::Failed(_) => Err(TransitionError {
                from: self,
                reason: "job already finished",
            }),
        }
    }

    /// Stages that may be in flight while the job sits in this state
    pub fn active_stages(&self) -> &'static [JobStage] {
        match self {
            JobState::Provisioning => &[JobStage::Provisioning, JobStage::Toolchain],
            JobState::ToolchainReady => &[JobStage::Build],
            JobState::Built => &[JobStage::Publish],
            JobState::Pending | JobState::Published | JobState::Failed(_) => &[],
        }
    }

    /// Moves to `Failed(stage)`; the stage must be one running in this state
    pub fn fail(self, stage: JobStage) -> Result<JobState, TransitionError> {
        if self.active_stages().contains(&stage) {
            Ok(JobState::Failed(stage))
        } else {
            Err(TransitionError {
                from: self,
                reason: "stage is not running in this state",
            })
        }
    }
}

/// One unit of the expanded build matrix
///
/// Each job owns a private output directory; no other job reads or writes it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub target: TargetSpec,
    pub release: Arc<Release>,
    pub output_dir: PathBuf,
}

impl Job {
    /// Creates a job whose output lives under `<workspace_base>/<release id>/<triple>`
    pub fn new(target: TargetSpec, release: Arc<Release>, workspace_base: &Path) -> Self {
        let output_dir = workspace_base
            .join(release.id.to_string())
            .join(&target.triple);
        Self {
            id: Uuid::new_v4(),
            target,
            release,
            output_dir,
        }
    }
}

/// Binary produced by a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub path: PathBuf,
    pub target: TargetSpec,
}

/// Terminal outcome of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobOutcome {
    Published { asset: UploadedAsset },
    Failed { stage: JobStage, cause: String },
}

/// Result of a job execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub target: TargetSpec,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Published { .. })
    }

    pub fn state(&self) -> JobState {
        match &self.outcome {
            JobOutcome::Published { .. } => JobState::Published,
            JobOutcome::Failed { stage, .. } => JobState::Failed(*stage),
        }
    }

    pub fn failed_stage(&self) -> Option<JobStage> {
        match &self.outcome {
            JobOutcome::Published { .. } => None,
            JobOutcome::Failed { stage, .. } => Some(*stage),
        }
    }
}

/// Aggregated results of one pipeline run, in registry order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub results: Vec<JobResult>,
}

impl PipelineReport {
    /// True when every job published its asset (vacuously true for no jobs)
    pub fn success(&self) -> bool {
        self.results.iter().all(JobResult::success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.success())
    }

    pub fn published(&self) -> impl Iterator<Item = &UploadedAsset> {
        self.results.iter().filter_map(|r| match &r.outcome {
            JobOutcome::Published { asset } => Some(asset),
            JobOutcome::Failed { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::target::HostPlatform;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = JobState::Pending;
        let mut seen = vec![state];
        while !state.is_terminal() {
            state = state.advance().unwrap();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                JobState::Pending,
                JobState::Provisioning,
                JobState::ToolchainReady,
                JobState::Built,
                JobState::Published,
            ]
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert!(JobState::Published.advance().is_err());
        assert!(JobState::Failed(JobStage::Build).advance().is_err());
        assert!(
            JobState::Failed(JobStage::Build)
                .fail(JobStage::Publish)
                .is_err()
        );
    }

    #[test]
    fn test_fail_only_from_running_stage() {
        assert_eq!(
            JobState::Provisioning.fail(JobStage::Toolchain),
            Ok(JobState::Failed(JobStage::Toolchain))
        );
        assert_eq!(
            JobState::ToolchainReady.fail(JobStage::Build),
            Ok(JobState::Failed(JobStage::Build))
        );
        assert!(JobState::ToolchainReady.fail(JobStage::Publish).is_err());
        assert!(JobState::Pending.fail(JobStage::Provisioning).is_err());
    }

    #[test]
    fn test_job_output_dir_is_unique_per_target() {
        let release = Arc::new(Release::new(9, "http://localhost/assets"));
        let base = Path::new("/tmp/shipwright");
        let a = Job::new(
            TargetSpec::new("x86_64-apple-darwin", HostPlatform::Macos, ""),
            Arc::clone(&release),
            base,
        );
        let b = Job::new(
            TargetSpec::new("x86_64-unknown-linux-musl", HostPlatform::Linux, ""),
            release,
            base,
        );

        assert_ne!(a.output_dir, b.output_dir);
        assert_eq!(a.output_dir, base.join("9").join("x86_64-apple-darwin"));
    }

    #[test]
    fn test_empty_report_is_success() {
        assert!(PipelineReport::default().success());
    }
}
