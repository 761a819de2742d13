//! Volunteer matching service core.
//!
//! The [`workflows::matching`] module holds the job/application lifecycle engine; the remaining
//! modules carry the configuration, error, and telemetry plumbing shared with the API service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
