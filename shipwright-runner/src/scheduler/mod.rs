//! Scheduler layer for the runner
//!
//! Expands a release into jobs, runs each job's stage sequence and
//! aggregates the results into a pipeline report.

pub mod orchestrator;
pub mod pipeline;

pub use orchestrator::{Orchestrator, plan_jobs};
pub use pipeline::JobPipeline;
