// src/strategies/errors.rs
//! Error types for the strategy module
//!
//! Registry/factory failures (`StrategyError`) are kept apart from failures
//! raised by a strategy while it runs (`ExecutionError`).

use crate::logging::codes::{self, Code};
use crate::strategies::contract::Capability;
use crate::strategies::kind::StrategyKind;

/// Strategy registry, loading and factory errors
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("Unsupported strategy kind: '{kind}'")]
    UnsupportedKind { kind: String },

    #[error("No {kind} strategy registered for '{value}'")]
    StrategyNotFound { kind: StrategyKind, value: String },

    #[error("Duplicate {kind} strategy '{value}': registered by '{existing_package}' and '{duplicate_package}'")]
    DuplicateStrategy {
        kind: StrategyKind,
        value: String,
        existing_package: String,
        duplicate_package: String,
    },

    #[error("Failed to load strategy implementation '{symbol}' from module '{module}': {reason}")]
    ImplementationLoad {
        module: String,
        symbol: String,
        reason: String,
    },

    #[error("Malformed {kind} strategy '{value}': missing capability '{capability}'")]
    MalformedStrategy {
        kind: StrategyKind,
        value: String,
        capability: Capability,
    },

    #[error("Configuration has no '{field}' value to select a {kind} strategy")]
    MissingDiscriminator {
        kind: StrategyKind,
        field: &'static str,
    },

    #[error("Strategy {kind} '{value}' could not be instantiated: {source}")]
    Instantiation {
        kind: StrategyKind,
        value: String,
        #[source]
        source: ExecutionError,
    },

    #[error("Invalid plugin manifest: {reason}")]
    Manifest { reason: String },
}

impl StrategyError {
    /// Logging code for this error
    pub fn code(&self) -> Code {
        match self {
            StrategyError::UnsupportedKind { .. } => codes::registry::UNSUPPORTED_KIND,
            StrategyError::StrategyNotFound { .. } => codes::registry::STRATEGY_NOT_FOUND,
            StrategyError::DuplicateStrategy { .. } => codes::registry::DUPLICATE_STRATEGY,
            StrategyError::ImplementationLoad { .. } => {
                codes::registry::IMPLEMENTATION_LOAD_FAILURE
            }
            StrategyError::MalformedStrategy { .. } => codes::registry::MALFORMED_STRATEGY,
            StrategyError::MissingDiscriminator { .. } => codes::factory::MISSING_DISCRIMINATOR,
            StrategyError::Instantiation { .. } => codes::factory::INSTANTIATION_FAILURE,
            StrategyError::Manifest { .. } => codes::registry::INVALID_MANIFEST,
        }
    }
}

/// Errors raised by strategy contract methods (`initialize`, `get`, `run`, `status`)
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Required session data missing: '{key}'")]
    MissingSessionData { key: String },

    #[error("Session data '{key}' is invalid: {reason}")]
    InvalidSessionData { key: String, reason: String },

    #[error("Operation '{operation}' is not supported by strategy '{strategy}'")]
    UnsupportedOperation {
        operation: &'static str,
        strategy: String,
    },

    #[error("Invalid strategy configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Unknown job: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Strategy failed: {reason}")]
    Failed { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExecutionError {
    pub fn missing(key: impl Into<String>) -> Self {
        ExecutionError::MissingSessionData { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ExecutionError::InvalidSessionData {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        ExecutionError::Failed {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> Code {
        match self {
            ExecutionError::MissingSessionData { .. } => codes::execution::MISSING_SESSION_DATA,
            ExecutionError::InvalidSessionData { .. } => codes::execution::INVALID_SESSION_DATA,
            ExecutionError::UnsupportedOperation { .. } => {
                codes::execution::UNSUPPORTED_OPERATION
            }
            ExecutionError::InvalidConfiguration { .. } => codes::factory::INVALID_CONFIGURATION,
            ExecutionError::JobNotFound { .. } => codes::execution::JOB_NOT_FOUND,
            ExecutionError::Failed { .. } | ExecutionError::Io(_) => {
                codes::execution::STRATEGY_FAILURE
            }
            ExecutionError::Serialization(_) => codes::system::SERIALIZATION_FAILURE,
        }
    }
}
