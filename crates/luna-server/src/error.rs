//! REST errors as JSON responses: `{code, message, data: {status}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use luna_core::errors::{LunaErrorCode, RestError};

pub struct ApiError(pub RestError);

impl From<RestError> for ApiError {
    fn from(err: RestError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = json!({
            "code": self.0.error_code(),
            "message": self.0.to_string(),
            "data": { "status": status.as_u16() },
        });
        (status, Json(body)).into_response()
    }
}
