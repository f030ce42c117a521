//! Submission orchestration engine for syndicating one business profile to many
//! listing directories and reconciling their delayed verification emails.

pub mod config;
pub mod error;
pub mod persist;
pub mod session;
pub mod telemetry;
pub mod workflows;
