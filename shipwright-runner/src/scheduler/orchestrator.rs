//! Pipeline orchestrator
//!
//! Expands a release into one job per registered target, runs the jobs
//! concurrently and collects their results. A failed job never stops the
//! others; the orchestrator waits for every job to reach a terminal state.

use chrono::Utc;
use shipwright_core::domain::job::{
    Job, JobOutcome, JobResult, JobStage, JobState, PipelineReport,
};
use shipwright_core::domain::release::Release;
use shipwright_core::domain::target::TargetRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, info_span, warn};

use crate::cancel::CancelSignal;
use crate::context::{JobContext, StateHandle};
use crate::scheduler::JobPipeline;

/// Fans a release out over the target registry
pub struct Orchestrator {
    registry: TargetRegistry,
    pipeline: Arc<JobPipeline>,
    workspace_base: PathBuf,
    semaphore: Option<Arc<Semaphore>>,
    cancel: CancelSignal,
}

impl Orchestrator {
    pub fn new(
        registry: TargetRegistry,
        pipeline: Arc<JobPipeline>,
        workspace_base: PathBuf,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            registry,
            pipeline,
            workspace_base,
            semaphore: None,
            cancel,
        }
    }

    /// Caps the number of jobs running at once; unbounded otherwise
    pub fn with_max_parallel_jobs(mut self, max: usize) -> Self {
        self.semaphore = Some(Arc::new(Semaphore::new(max.max(1))));
        self
    }

    /// Jobs a run for `release` would execute, in registry order
    pub fn plan(&self, release: &Arc<Release>) -> Vec<Job> {
        plan_jobs(&self.registry, release, &self.workspace_base)
    }

    /// Runs every job for `release` and reports their results in registry order
    pub async fn run(&self, release: Release) -> PipelineReport {
        let release = Arc::new(release);
        let jobs = self.plan(&release);

        if jobs.is_empty() {
            info!("No targets registered, nothing to do for {}", release.label());
            return PipelineReport::default();
        }

        info!(
            "Dispatching {} job(s) for release {}",
            jobs.len(),
            release.label()
        );

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let ctx = JobContext::new(job.clone());
            let state = ctx.state_handle();
            let handle = self.spawn_job_task(ctx);
            handles.push((job, state, handle));
        }

        let mut report = PipelineReport::default();
        for (job, state, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Job task for {} panicked: {}", job.target.triple, e);
                    aborted_result(job, &state, e.to_string())
                }
            };
            report.results.push(result);
        }

        let failed = report.failures().count();
        if failed == 0 {
            info!("All {} job(s) published", report.results.len());
        } else {
            warn!(
                "{} of {} job(s) failed for release {}",
                failed,
                report.results.len(),
                release.label()
            );
        }

        report
    }

    /// Spawns a task to execute a single job
    fn spawn_job_task(&self, ctx: JobContext) -> tokio::task::JoinHandle<JobResult> {
        let pipeline = Arc::clone(&self.pipeline);
        let semaphore = self.semaphore.clone();
        let cancel = self.cancel.clone();
        let span = info_span!("job", triple = %ctx.job.target.triple);

        tokio::spawn(
            async move {
                // Permit is released when dropped at the end of the job
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                pipeline.execute(ctx, &cancel).await
            }
            .instrument(span),
        )
    }
}

/// Expands the registry into one job per target, in registry order
pub fn plan_jobs(
    registry: &TargetRegistry,
    release: &Arc<Release>,
    workspace_base: &Path,
) -> Vec<Job> {
    registry
        .list_targets()
        .iter()
        .map(|target| Job::new(target.clone(), Arc::clone(release), workspace_base))
        .collect()
}

/// Result for a job whose task died before reporting
fn aborted_result(job: Job, state: &StateHandle, cause: String) -> JobResult {
    let last = *state.lock().unwrap_or_else(|e| e.into_inner());
    let stage = match last {
        JobState::Failed(stage) => stage,
        other => other
            .active_stages()
            .first()
            .copied()
            .unwrap_or(JobStage::Provisioning),
    };

    let now = Utc::now();
    JobResult {
        job_id: job.id,
        target: job.target,
        started_at: now,
        completed_at: now,
        outcome: JobOutcome::Failed {
            stage,
            cause: format!("job task aborted: {}", cause),
        },
    }
}
