//! HTTP error envelope.
//!
//! DESIGN
//! ======
//! Services return typed errors that carry a stable machine code through
//! `ErrorCode`. Route handlers convert them into `ApiError`, which renders as
//! `{"code": "...", "message": "..."}` with the mapped status. Database
//! detail is logged server-side and replaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::services::ServiceError;
use crate::validate::ValidationError;

/// Stable machine-readable code for an error variant.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn status(&self) -> StatusCode;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "E_BAD_REQUEST", message)
    }

    pub fn from_code(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::new(err.status(), err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        if let ServiceError::Database(inner) = &err {
            tracing::error!(error = %inner, "database error");
            return Self::new(err.status(), err.error_code(), "internal database error");
        }
        Self::from_code(&err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::from_code(&err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn not_found_maps_to_404() {
        let err: ApiError = ServiceError::NotFound { entity: "patient", id: Uuid::nil() }.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "E_NOT_FOUND");
        assert!(err.message.contains("patient"));
    }

    #[test]
    fn conflict_maps_to_409() {
        let err: ApiError = ServiceError::Conflict("already decided".into()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "E_CONFLICT");
        assert_eq!(err.message, "already decided");
    }

    #[test]
    fn database_detail_is_not_echoed() {
        let err: ApiError = ServiceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "E_DATABASE");
        assert_eq!(err.message, "internal database error");
    }

    #[test]
    fn validation_error_maps_to_400() {
        let err: ApiError = ValidationError::Required("first_name").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "E_VALIDATION");
        assert_eq!(err.message, "first_name is required");
    }

    #[test]
    fn serializes_code_and_message_only() {
        let err = ApiError::bad_request("nope");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!({"code": "E_BAD_REQUEST", "message": "nope"}));
    }
}
