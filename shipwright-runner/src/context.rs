//! Execution context for a single job
//!
//! Tracks the job's lifecycle state while its stages run:
//! - The job being executed (target, release, private output directory)
//! - The current state, readable by the orchestrator even if the job task dies
//! - Start time, used when the terminal result is recorded

use chrono::{DateTime, Utc};
use shipwright_core::domain::job::{Job, JobOutcome, JobResult, JobState};
use shipwright_core::dto::asset::UploadedAsset;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::JobError;

/// Shared view of a job's current state
pub type StateHandle = Arc<Mutex<JobState>>;

pub struct JobContext {
    pub job: Job,
    state: StateHandle,
    started_at: DateTime<Utc>,
}

impl JobContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            state: Arc::new(Mutex::new(JobState::Pending)),
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state_handle(&self) -> StateHandle {
        Arc::clone(&self.state)
    }

    /// Moves the job one step along the success path
    pub fn advance(&self) -> JobState {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.advance() {
            Ok(next) => {
                debug!(
                    "Job {} ({}): {:?} -> {:?}",
                    self.job.id, self.job.target.triple, *state, next
                );
                *state = next;
            }
            Err(e) => warn!("Job {}: {}", self.job.id, e),
        }
        *state
    }

    /// Records the terminal result of the job
    pub fn finish(self, outcome: Result<UploadedAsset, JobError>) -> JobResult {
        let outcome = match outcome {
            Ok(asset) => {
                self.advance();
                JobOutcome::Published { asset }
            }
            Err(err) => {
                let stage = err.stage();
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                match state.fail(stage) {
                    Ok(failed) => *state = failed,
                    Err(e) => warn!("Job {}: {}", self.job.id, e),
                }
                JobOutcome::Failed {
                    stage,
                    cause: err.to_string(),
                }
            }
        };

        JobResult {
            job_id: self.job.id,
            target: self.job.target,
            started_at: self.started_at,
            completed_at: Utc::now(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipwright_core::domain::job::JobStage;
    use shipwright_core::domain::release::Release;
    use shipwright_core::domain::target::{HostPlatform, TargetSpec};
    use std::path::Path;

    fn context() -> JobContext {
        JobContext::new(Job::new(
            TargetSpec::new("x86_64-unknown-linux-musl", HostPlatform::Linux, ""),
            Arc::new(Release::new(1, "http://localhost/assets")),
            Path::new("/tmp/shipwright"),
        ))
    }

    #[test]
    fn test_state_handle_tracks_progress() {
        let ctx = context();
        let handle = ctx.state_handle();

        assert_eq!(ctx.advance(), JobState::Provisioning);
        assert_eq!(*handle.lock().unwrap(), JobState::Provisioning);
    }

    #[test]
    fn test_finish_success() {
        let ctx = context();
        ctx.advance();
        ctx.advance();
        ctx.advance();

        let result = ctx.finish(Ok(UploadedAsset {
            id: 1,
            name: "nebulizer-x86_64-unknown-linux-musl".to_string(),
            size: 4,
            browser_download_url: None,
        }));

        assert!(result.success());
        assert_eq!(result.state(), JobState::Published);
    }

    #[test]
    fn test_finish_failure_records_stage() {
        let ctx = context();
        ctx.advance();
        ctx.advance();
        let handle = ctx.state_handle();

        let result = ctx.finish(Err(JobError::Build {
            triple: "x86_64-unknown-linux-musl".to_string(),
            source: anyhow::anyhow!("linker error"),
        }));

        assert_eq!(result.state(), JobState::Failed(JobStage::Build));
        assert_eq!(*handle.lock().unwrap(), JobState::Failed(JobStage::Build));
        match result.outcome {
            JobOutcome::Failed { cause, .. } => assert!(cause.contains("linker error")),
            JobOutcome::Published { .. } => panic!("expected failure"),
        }
    }
}
