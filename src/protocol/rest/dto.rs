//! REST API Data Transfer Objects
//!
//! Defines request/response types for the REST API endpoints.

use serde::{Deserialize, Serialize};

use crate::catalog::QuestionSummary;
use crate::error::PracticeError;

/// JSON response: { success, data?, error? }
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorDto>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed response that still carries a payload (e.g. a timed query result).
    pub fn failure(data: T, error: &PracticeError) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(ApiErrorDto::from(error)),
        }
    }
}

/// Error details in API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDto {
    pub code: String,
    pub message: String,
}

impl From<&PracticeError> for ApiErrorDto {
    fn from(err: &PracticeError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// Session DTOs

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub session_token: String,
    pub user_sql: String,
    /// Catalog question to check the answer against
    #[serde(default)]
    pub question_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub session_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// False if the token was unknown or already gone
    pub terminated: bool,
}

// Question DTOs

#[derive(Debug, Serialize)]
pub struct QuestionListDto {
    pub questions: Vec<QuestionSummary>,
    pub count: usize,
}

// Admin DTOs

#[derive(Debug, Deserialize)]
pub struct SweepRequest {
    /// Defaults to the configured idle timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    pub removed: usize,
    pub remaining: usize,
}
