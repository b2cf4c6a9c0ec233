//! # Configuration models

pub mod config;

pub use config::{url_scheme, ConfigError, ConfigId, StrategyConfig, CONFIGURATION_FIELD};
