//! Admin Handlers
//!
//! Health check and maintenance endpoints.

use std::sync::Arc;

use axum::{http::StatusCode, Extension, Json};

use crate::protocol::rest::dto::{ApiResponse, SweepRequest, SweepResponse};
use crate::service::{HealthSnapshot, PracticeService};

/// Health check endpoint
///
/// Returns 503 once the pool has been shut down so load balancers drain us.
pub async fn health(
    Extension(service): Extension<Arc<PracticeService>>,
) -> (StatusCode, Json<ApiResponse<HealthSnapshot>>) {
    let snapshot = service.health_snapshot();
    let status = if snapshot.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ApiResponse::success(snapshot)))
}

/// Run an idle-session sweep immediately: `POST /api/admin/sweep`
pub async fn sweep(
    Extension(service): Extension<Arc<PracticeService>>,
    Json(request): Json<SweepRequest>,
) -> Json<ApiResponse<SweepResponse>> {
    let timeout_secs = request
        .timeout_secs
        .unwrap_or(service.session_config().idle_timeout_secs);
    let removed = service.sweep_now(timeout_secs);
    Json(ApiResponse::success(SweepResponse {
        removed,
        remaining: service.store().count(),
    }))
}
