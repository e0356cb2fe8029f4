//! Error types for the HTTP layer.
//!
//! [`ApiError`] wraps the core taxonomy plus request-shape failures and
//! converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body is `{"error": message, "status": code}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use marquee_core::error::CoreError;

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A core operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body or query string could not be parsed.
    #[error("{0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Core(CoreError::Validation(_)) | Self::InvalidRequest(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Core(CoreError::Verification | CoreError::Forbidden) => StatusCode::FORBIDDEN,
            Self::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(CoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Core(CoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "request rejected");
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_documented_statuses() {
        let cases = [
            (CoreError::Validation(String::new()), 422),
            (CoreError::Verification, 403),
            (CoreError::NotFound(String::new()), 404),
            (CoreError::Forbidden, 403),
            (CoreError::Conflict(String::new()), 409),
            (CoreError::Backend(String::new()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), code);
        }
        assert_eq!(
            ApiError::InvalidRequest(String::from("bad json")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
