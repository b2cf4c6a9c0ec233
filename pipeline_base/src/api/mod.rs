//! # Public API
//!
//! [`PipelineService`] is the entry point a front end (HTTP routes, CLI)
//! calls; every operation returns a [`PipelineError`] on failure.

pub mod errors;
pub mod service;

pub use errors::PipelineError;
pub use service::PipelineService;
