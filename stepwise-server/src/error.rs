//! HTTP error mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Error returned by a route.
///
/// Request-shape problems answer `422 Unprocessable Entity`, everything
/// else `500 Internal Server Error`. The body is always
/// `{"detail": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The planner rejected or failed the request.
    #[error(transparent)]
    Planner(#[from] stepwise::Error),

    /// The body could not be read as the route's request type.
    #[error("{0}")]
    Rejected(#[from] JsonRejection),
}

impl ApiError {
    /// Status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Planner(err) if err.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Planner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), %detail, "request failed");
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
