use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failures from the GA4 Data API surface as 502 so callers can tell a
/// broken upstream apart from a bad request of their own.
pub fn map_upstream_error(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{err:#}"), "GA4 upstream error");
    AppError::new(StatusCode::BAD_GATEWAY, format!("{err:#}"))
}
