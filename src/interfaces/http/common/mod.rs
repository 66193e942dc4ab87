//! Shared HTTP types: response envelope, error mapping, validated extractor

pub mod validated_json;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::DomainError;

pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

/// Standard API response envelope
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "description"}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// Payload, `null` on error
    pub data: Option<T>,
    /// Error description, omitted on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error returned by handlers, rendered as an `ApiResponse` error envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let status = match &e {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Storage(detail) => {
                error!(error = %detail, "Storage failure while handling request");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

/// Handler result carrying an enveloped payload
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap a value in a successful envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (DomainError::not_found("User", "id", "1"), StatusCode::NOT_FOUND),
            (DomainError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (DomainError::Conflict("dup".into()), StatusCode::CONFLICT),
            (DomainError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (DomainError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (DomainError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let err = ApiError::from(DomainError::Storage("disk I/O error at /var/db".into()));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn error_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::error("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "data": null, "error": "nope"}));

        let body = serde_json::to_value(ApiResponse::success(5)).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 5}));
    }
}
