//! REST API Error Types
//!
//! Provides error types and conversions for the REST API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::ApiErrorDto;
use crate::error::PracticeError;

/// REST API error that can be returned from handlers
#[derive(Debug)]
pub struct RestError {
    pub status: StatusCode,
    pub error: ApiErrorDto,
}

impl RestError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiErrorDto {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

/// HTTP status for a service error.
pub fn status_for(err: &PracticeError) -> StatusCode {
    match err {
        PracticeError::Validation { .. }
        | PracticeError::QuerySafetyViolation { .. }
        | PracticeError::EngineExecution { .. } => StatusCode::BAD_REQUEST,
        PracticeError::SessionNotFound | PracticeError::SessionExpired => StatusCode::UNAUTHORIZED,
        PracticeError::CapacityExceeded { .. } | PracticeError::PoolUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PracticeError::PoolInitialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.error
        }));
        (self.status, body).into_response()
    }
}

// Conversions from domain errors
impl From<PracticeError> for RestError {
    fn from(err: PracticeError) -> Self {
        Self {
            status: status_for(&err),
            error: ApiErrorDto::from(&err),
        }
    }
}
