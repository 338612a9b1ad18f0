use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use core_types::Exception;

/// Wraps an [`Exception`] so handlers can return it with `?`.
#[derive(Debug)]
pub struct ApiError(pub Exception);

impl From<Exception> for ApiError {
    fn from(exception: Exception) -> Self {
        Self(exception)
    }
}

/// Renders the exception as `{"message": <code>}` with its own status.
/// The cause chain only ever reaches the logs.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let exception = self.0;
        let status =
            StatusCode::from_u16(exception.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                code = exception.code(),
                origin = exception.origin().as_str(),
                cause = ?exception.cause(),
                "Request failed"
            );
        } else {
            tracing::warn!(
                code = exception.code(),
                origin = exception.origin().as_str(),
                cause = ?exception.cause(),
                "Request rejected"
            );
        }

        (status, Json(exception)).into_response()
    }
}
