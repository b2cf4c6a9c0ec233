//! # Service configuration
//!
//! `constants` holds fixed names; `runtime` holds the preferences an operator
//! may change through `PIPELINE_*` environment variables or a TOML file.

pub mod constants;
pub mod runtime;

pub use runtime::{
    ConfigLoadError, LoggingPreferences, RegistryPreferences, ServiceConfig,
    SessionPreferences,
};
