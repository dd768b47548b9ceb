//! HTTP mapping of core errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pathways_core::PathwayError;
use serde_json::json;

/// A core error on its way out as `{ "error": message }`.
#[derive(Debug)]
pub struct AppError(pub PathwayError);

impl From<PathwayError> for AppError {
    fn from(e: PathwayError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(%status, "{}", self.0);
        } else {
            tracing::warn!(%status, "{}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
