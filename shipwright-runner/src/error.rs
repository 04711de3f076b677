//! Job error taxonomy
//!
//! One variant per pipeline stage, each carrying the triple of the job it
//! belongs to. A job error only ever ends its own job.

use shipwright_core::domain::job::JobStage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("provisioning failed for {triple}: {source:#}")]
    Provisioning {
        triple: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("toolchain setup failed for {triple}: {source:#}")]
    Toolchain {
        triple: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build failed for {triple}: {source:#}")]
    Build {
        triple: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("upload failed for {triple}: {source:#}")]
    Upload {
        triple: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{stage} cancelled for {triple}")]
    Cancelled { triple: String, stage: JobStage },
}

impl JobError {
    /// Stage the job was in when it failed
    pub fn stage(&self) -> JobStage {
        match self {
            JobError::Provisioning { .. } => JobStage::Provisioning,
            JobError::Toolchain { .. } => JobStage::Toolchain,
            JobError::Build { .. } => JobStage::Build,
            JobError::Upload { .. } => JobStage::Publish,
            JobError::Cancelled { stage, .. } => *stage,
        }
    }

    pub fn triple(&self) -> &str {
        match self {
            JobError::Provisioning { triple, .. }
            | JobError::Toolchain { triple, .. }
            | JobError::Build { triple, .. }
            | JobError::Upload { triple, .. }
            | JobError::Cancelled { triple, .. } => triple,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled { .. })
    }
}
