//! Error handling for the axum server.
//! Maps `KgError` to HTTP status codes and JSON error bodies via `http_status()`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kg_core::error::KgError;
use serde_json::json;

/// Wrapper to convert `KgError` into an axum response.
pub struct AppError(KgError);

impl From<KgError> for AppError {
    fn from(e: KgError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = json!({
            "error": self.0.to_string(),
            "code": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
