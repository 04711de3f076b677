//! Core domain types
//!
//! These types describe the build matrix and the lifecycle of a single
//! build-and-publish job. They are shared between the runner (which executes
//! jobs) and the client (which uploads their artifacts).

pub mod job;
pub mod provision;
pub mod release;
pub mod target;
