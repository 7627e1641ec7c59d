//! Question Handlers
//!
//! Read-only access to the embedded question catalog.

use axum::{
    extract::{Path, Query},
    Json,
};

use crate::catalog::{self, Question, QuestionFilter};
use crate::protocol::rest::dto::{ApiResponse, QuestionListDto};
use crate::protocol::rest::error::RestError;

/// `GET /api/questions?difficulty=&category=&tag=&skip=&limit=`
pub async fn list_questions(
    Query(filter): Query<QuestionFilter>,
) -> Json<ApiResponse<QuestionListDto>> {
    let questions = catalog::list(&filter);
    Json(ApiResponse::success(QuestionListDto {
        count: questions.len(),
        questions,
    }))
}

/// `GET /api/questions/:slug`
pub async fn get_question(
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<&'static Question>>, RestError> {
    let question = catalog::find_by_slug(&slug)
        .ok_or_else(|| RestError::not_found(format!("Question '{slug}' not found")))?;
    Ok(Json(ApiResponse::success(question)))
}
