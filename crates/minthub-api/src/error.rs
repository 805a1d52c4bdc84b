//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use minthub_core::Error;

/// Wrapper turning core errors into HTTP responses.
///
/// Bodies carry `{"error": "..."}` with the error's display message
/// verbatim, so clients surface the same text the job records do.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) | Error::InvalidAmount(_) | Error::UnsupportedType(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Chain(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(subsystem = "api", error = %self.0, "Request failed");
        }

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}
