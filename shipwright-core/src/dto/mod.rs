//! Data Transfer Objects
//!
//! Payloads exchanged with the release host: the inbound release event and
//! the asset upload request/response.

pub mod asset;
pub mod event;
