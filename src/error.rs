//! Error types surfaced to callers of the practice service.

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// Service error type.
///
/// Every per-request failure is one of these, returned as data inside a
/// structured result. Only `PoolInitialization` is fatal, and only at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PracticeError {
    /// Missing or malformed caller input
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// Token was never issued or has been removed
    #[error("Session not found")]
    SessionNotFound,

    /// Session is still registered but idle past the timeout
    #[error("Session expired")]
    SessionExpired,

    /// Query text failed the safety filter
    #[error("Query rejected: {reason}")]
    QuerySafetyViolation { reason: String },

    /// The engine reported a query-level problem
    #[error("{message}")]
    EngineExecution { message: String },

    /// Engine pool could not be created
    #[error("Engine pool initialization failed: {message}")]
    PoolInitialization { message: String },

    /// The pool is not accepting new sessions (not initialized or shut down)
    #[error("Engine pool unavailable")]
    PoolUnavailable,

    /// Session limit reached
    #[error("Maximum number of sessions ({max}) exceeded")]
    CapacityExceeded { max: usize },
}

impl PracticeError {
    pub fn validation(message: impl Into<String>) -> Self {
        PracticeError::Validation {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            PracticeError::Validation { .. } => "VALIDATION_ERROR",
            PracticeError::SessionNotFound => "SESSION_NOT_FOUND",
            PracticeError::SessionExpired => "SESSION_EXPIRED",
            PracticeError::QuerySafetyViolation { .. } => "QUERY_REJECTED",
            PracticeError::EngineExecution { .. } => "EXECUTION_ERROR",
            PracticeError::PoolInitialization { .. } => "POOL_INIT_ERROR",
            PracticeError::PoolUnavailable => "POOL_UNAVAILABLE",
            PracticeError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
        }
    }

    /// Whether the caller should log in again to recover.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            PracticeError::SessionNotFound | PracticeError::SessionExpired
        )
    }
}

impl From<EngineError> for PracticeError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Query { message } => PracticeError::EngineExecution { message },
            other => PracticeError::EngineExecution {
                message: other.to_string(),
            },
        }
    }
}

/// Result alias for service operations.
pub type PracticeResult<T> = Result<T, PracticeError>;
