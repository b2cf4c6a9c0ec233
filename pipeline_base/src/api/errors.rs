//! # Pipeline Errors

use crate::logging::codes::{self, Code};
use crate::models::ConfigError;
use crate::session::{SessionError, StoreError};
use crate::strategies::{ExecutionError, StrategyError};

/// Error type returned by every `PipelineService` operation
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Configuration not found: {config_id}")]
    ConfigNotFound { config_id: String },

    #[error("Stored record could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Logging code of the underlying failure
    pub fn code(&self) -> Code {
        match self {
            PipelineError::Strategy(e) => e.code(),
            PipelineError::Execution(e) => e.code(),
            PipelineError::Session(e) => e.code(),
            PipelineError::Store(e) => e.code(),
            PipelineError::Config(e) => e.code(),
            PipelineError::ConfigNotFound { .. } => codes::orchestration::CONFIG_NOT_FOUND,
            PipelineError::Serialization(_) => codes::system::SERIALIZATION_FAILURE,
        }
    }

    /// HTTP-equivalent status for a front end to report
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::ConfigNotFound { .. }
            | PipelineError::Strategy(StrategyError::StrategyNotFound { .. })
            | PipelineError::Session(SessionError::NotFound { .. })
            | PipelineError::Execution(ExecutionError::JobNotFound { .. }) => 404,

            PipelineError::Config(_)
            | PipelineError::Strategy(StrategyError::UnsupportedKind { .. })
            | PipelineError::Strategy(StrategyError::MissingDiscriminator { .. })
            | PipelineError::Strategy(StrategyError::Instantiation { .. })
            | PipelineError::Session(SessionError::InvalidId { .. })
            | PipelineError::Session(SessionError::NotAList { .. })
            | PipelineError::Execution(ExecutionError::MissingSessionData { .. })
            | PipelineError::Execution(ExecutionError::InvalidSessionData { .. })
            | PipelineError::Execution(ExecutionError::UnsupportedOperation { .. })
            | PipelineError::Execution(ExecutionError::InvalidConfiguration { .. }) => 400,

            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
