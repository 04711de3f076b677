//! Shipwright Core
//!
//! Core types for the Shipwright release pipeline.
//!
//! This crate contains:
//! - Domain types: build targets, releases, jobs and their state machine
//! - DTOs: the inbound release event and the asset upload payloads
//! - The pipeline manifest (the build matrix configuration surface)
//!
//! Nothing in here performs I/O. Execution lives in the runner, HTTP in the client.

pub mod domain;
pub mod dto;
pub mod manifest;
