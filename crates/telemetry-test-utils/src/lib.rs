//! Shared test utilities for the telemetry pipeline workspace.
//!
//! This crate provides standardised context fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`]: in-memory context documents for a dev and a prod stage
//! - [`project`]: [`TestProject`] builder writing context documents to disk

pub mod fixtures;
pub mod project;

pub use fixtures::{sample_document, service};
pub use project::TestProject;
