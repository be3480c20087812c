//! Liveness endpoint and the catch-all for unmatched routes.

use axum::{Json, http::Uri};

use crate::api::models::StatusResponse;
use crate::errors::Error;

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    summary = "Service status",
    responses(
        (status = 200, description = "Service is running", body = StatusResponse),
    )
)]
pub async fn index() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "A Cars Backend Server is running!".to_string(),
    })
}

/// Fallback for every route without a handler, including known paths with the wrong method.
pub async fn not_found(uri: Uri) -> Error {
    Error::NotFound {
        path: uri.path().to_string(),
    }
}
