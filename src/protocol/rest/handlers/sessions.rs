//! Session Handlers
//!
//! Endpoints for session lifecycle management and session-scoped query
//! execution.

use std::sync::Arc;

use axum::{
    extract::Path,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::protocol::rest::dto::{
    ApiResponse, ExecuteRequest, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse,
};
use crate::protocol::rest::error::{status_for, RestError};
use crate::service::PracticeService;
use crate::session::SessionInfo;

/// Open a session: `POST /api/login`
pub async fn login(
    Extension(service): Extension<Arc<PracticeService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, RestError> {
    // Opening a connection touches the engine; keep it off the async workers.
    let svc = Arc::clone(&service);
    let session_token = tokio::task::spawn_blocking(move || svc.create_session(&request.user_id))
        .await
        .map_err(|e| RestError::internal(format!("login task failed: {e}")))??;

    Ok(Json(ApiResponse::success(LoginResponse { session_token })))
}

/// Run SQL on the caller's session: `POST /api/execute`
///
/// Query-level failures (rejected or failed SQL) still return the timed
/// result in `data`, with a 400 status.
pub async fn execute(
    Extension(service): Extension<Arc<PracticeService>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Response, RestError> {
    let svc = Arc::clone(&service);
    let result = tokio::task::spawn_blocking(move || {
        svc.execute_on_session(
            &request.session_token,
            &request.user_sql,
            request.question_id.as_deref(),
        )
    })
    .await
    .map_err(|e| RestError::internal(format!("execution task failed: {e}")))??;

    let response = match result.error.clone() {
        None => Json(ApiResponse::success(result)).into_response(),
        Some(err) => (status_for(&err), Json(ApiResponse::failure(result, &err))).into_response(),
    };
    Ok(response)
}

/// Close a session: `POST /api/logout`
pub async fn logout(
    Extension(service): Extension<Arc<PracticeService>>,
    Json(request): Json<LogoutRequest>,
) -> Json<ApiResponse<LogoutResponse>> {
    let terminated = service.terminate_session(&request.session_token);
    Json(ApiResponse::success(LogoutResponse { terminated }))
}

/// Session info: `GET /api/session/:token`
pub async fn get_session(
    Extension(service): Extension<Arc<PracticeService>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, RestError> {
    let info = service.lookup_session(&token)?;
    Ok(Json(ApiResponse::success(info)))
}
