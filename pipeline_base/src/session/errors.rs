//! Session and store errors

use crate::logging::codes::{self, Code};

/// Key/value store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend failure: {reason}")]
    Backend { reason: String },
}

impl StoreError {
    pub fn backend(reason: impl Into<String>) -> Self {
        StoreError::Backend {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> Code {
        codes::system::STORE_FAILURE
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("Not a session identifier: '{session_id}'")]
    InvalidId { session_id: String },

    #[error("Session key '{key}' does not hold a list")]
    NotAList { key: String },

    #[error("Stored record '{key}' is invalid: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    pub fn code(&self) -> Code {
        match self {
            SessionError::NotFound { .. } | SessionError::InvalidId { .. } => {
                codes::session::SESSION_NOT_FOUND
            }
            SessionError::NotAList { .. } => codes::session::SESSION_KEY_NOT_A_LIST,
            SessionError::InvalidRecord { .. } => codes::session::INVALID_SESSION_RECORD,
            SessionError::Store(err) => err.code(),
            SessionError::Serialization(_) => codes::system::SERIALIZATION_FAILURE,
        }
    }
}
