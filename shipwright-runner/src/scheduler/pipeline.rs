//! Per-job stage sequence
//!
//! Runs Provision -> Toolchain -> Build -> Publish for one job, strictly in
//! that order. A failing stage ends the job; later stages never start, so a
//! job that failed before publishing never uploads anything.

use shipwright_core::domain::job::{Job, JobResult, JobStage};
use shipwright_core::dto::asset::UploadedAsset;
use std::future::Future;
use tracing::{error, info, warn};

use crate::cancel::CancelSignal;
use crate::context::JobContext;
use crate::error::JobError;
use crate::service::{BuildExecutor, Provisioner, Publisher, ToolchainInstaller};

/// The four stage services shared by every job of a run
pub struct JobPipeline {
    pub provisioner: Provisioner,
    pub installer: ToolchainInstaller,
    pub executor: BuildExecutor,
    pub publisher: Publisher,
    /// Pinned toolchain version
    pub toolchain: String,
}

impl JobPipeline {
    /// Executes one job to a terminal result
    pub async fn execute(&self, ctx: JobContext, cancel: &CancelSignal) -> JobResult {
        info!(
            "Starting job {} for {} (release {})",
            ctx.job.id,
            ctx.job.target.triple,
            ctx.job.release.label()
        );

        let outcome = self.run_stages(&ctx, cancel).await;

        match &outcome {
            Ok(asset) => info!("Job {} published {}", ctx.job.id, asset.name),
            Err(e) if e.is_cancelled() => warn!("Job {} for {}: {}", ctx.job.id, e.triple(), e),
            Err(e) => error!("Job {} failed in state {:?}: {}", ctx.job.id, ctx.state(), e),
        }

        ctx.finish(outcome)
    }

    async fn run_stages(
        &self,
        ctx: &JobContext,
        cancel: &CancelSignal,
    ) -> Result<UploadedAsset, JobError> {
        let job: &Job = &ctx.job;
        let target = &job.target;

        ctx.advance();
        guarded(
            cancel,
            job,
            JobStage::Provisioning,
            self.provisioner.provision(target),
        )
        .await?;
        guarded(
            cancel,
            job,
            JobStage::Toolchain,
            self.installer
                .install(target.host_platform, &target.triple, &self.toolchain),
        )
        .await?;

        ctx.advance();
        let artifact = guarded(
            cancel,
            job,
            JobStage::Build,
            self.executor.build(target, &job.output_dir),
        )
        .await?;

        ctx.advance();
        // The upload itself is not raced against cancellation: once started it
        // runs to completion so the release never holds a truncated asset.
        check_cancelled(cancel, job, JobStage::Publish)?;
        self.publisher.publish(&job.release, target, &artifact).await
    }
}

fn check_cancelled(cancel: &CancelSignal, job: &Job, stage: JobStage) -> Result<(), JobError> {
    if cancel.is_cancelled() {
        return Err(JobError::Cancelled {
            triple: job.target.triple.clone(),
            stage,
        });
    }
    Ok(())
}

/// Runs a stage unless cancellation fires first; dropping the stage kills its subprocess
async fn guarded<T>(
    cancel: &CancelSignal,
    job: &Job,
    stage: JobStage,
    fut: impl Future<Output = Result<T, JobError>>,
) -> Result<T, JobError> {
    check_cancelled(cancel, job, stage)?;

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(JobError::Cancelled {
            triple: job.target.triple.clone(),
            stage,
        }),
        result = fut => result,
    }
}
