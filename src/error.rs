use access::AccessError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Maps the access-control error taxonomy onto HTTP responses.
///
/// Storage failures are logged with their detail but answered generically;
/// authorization failures never reveal whether the targeted resource
/// exists.
#[derive(Debug)]
pub struct ApiError(pub AccessError);

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            AccessError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.0.to_string())
            }
            AccessError::DuplicateUsername => {
                (StatusCode::CONFLICT, "DUPLICATE_USERNAME", self.0.to_string())
            }
            AccessError::DuplicatePending => {
                (StatusCode::CONFLICT, "DUPLICATE_PENDING", self.0.to_string())
            }
            AccessError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                self.0.to_string(),
            ),
            AccessError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "ACCESS_DENIED", self.0.to_string())
            }
            AccessError::ForbiddenOperation => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN_OPERATION",
                self.0.to_string(),
            ),
            AccessError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.0.to_string()),
            AccessError::Timeout => {
                (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", self.0.to_string())
            }
            AccessError::PartialFailure(detail) => {
                error!(%detail, "operation partially applied");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STATE_INCONSISTENT",
                    "state may be inconsistent, please refresh".to_string(),
                )
            }
            AccessError::Store(detail) => {
                error!(%detail, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "internal storage error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}
