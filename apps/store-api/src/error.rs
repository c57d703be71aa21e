//! # API Error Types
//!
//! The one error type handlers return, and the JSON envelope it renders to.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError ──┐                                                          │
//! │  DbError ────┤                                                          │
//! │  AuthError ──┼──► ApiError { code, message } ──► IntoResponse          │
//! │  MailError ──┘          │                           │                   │
//! │                         │                           ▼                   │
//! │                  ErrorCode::status()      { "status": "fail",           │
//! │                                             "statusCode": 404,          │
//! │                                             "message": "…" }            │
//! │                                                                         │
//! │  development mode: `expose_error_details` re-renders the body with      │
//! │  the real message and a `stack` field                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use store_core::CoreError;
use store_db::DbError;

use crate::auth::AuthError;
use crate::mailer::MailError;

const GENERIC_MESSAGE: &str = "Something went wrong";
const DUPLICATE_MESSAGE: &str = "Duplicate value";

// =============================================================================
// Error Code
// =============================================================================

/// Error category; decides the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
    Unavailable,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

// =============================================================================
// Api Error
// =============================================================================

/// What the HTTP client sees when a request fails.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Debug rendering of the underlying error, for development responses.
    detail: Option<String>,
    /// Unexpected failures are reported as `Something went wrong` outside
    /// development.
    hidden: bool,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            detail: None,
            hidden: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// An unexpected failure whose message stays server-side.
    fn unexpected(message: impl Into<String>) -> Self {
        ApiError {
            hidden: true,
            ..ApiError::internal(message)
        }
    }

    fn with_detail(mut self, detail: impl fmt::Debug) -> Self {
        self.detail = Some(format!("{detail:?}"));
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let api = match &err {
            CoreError::Validation(_) | CoreError::Overpayment { .. } => {
                ApiError::bad_request(err.to_string())
            }
            CoreError::SchemaNotFound(_) => ApiError::internal(err.to_string()),
            CoreError::Decode(_) => ApiError::unexpected(err.to_string()),
        };
        api.with_detail(&err)
    }
}

/// ## Status Mapping
/// ```text
/// NotFound { entity }          → 404 "<entity> not found"
/// Duplicate                    → 400 "Duplicate value" (column only in `stack`)
/// MissingReference, Constraint → 400
/// Rejected(msg)                → 400 msg
/// TransactionFailed            → 400
/// StaleVersion                 → 409
/// everything else              → 500
/// ```
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let api = match &err {
            DbError::NotFound { entity, .. } => ApiError::not_found(format!("{entity} not found")),
            DbError::Duplicate { .. } => ApiError::bad_request(DUPLICATE_MESSAGE),
            DbError::MissingReference
            | DbError::Constraint(_)
            | DbError::Rejected(_)
            | DbError::TransactionFailed(_) => ApiError::bad_request(err.to_string()),
            DbError::StaleVersion => ApiError::new(ErrorCode::Conflict, err.to_string()),
            DbError::Connection(_)
            | DbError::Migration(_)
            | DbError::Query(_)
            | DbError::PoolExhausted => ApiError::unexpected(err.to_string()),
        };
        api.with_detail(&err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let api = match &err {
            AuthError::Forbidden => ApiError::forbidden(err.to_string()),
            AuthError::Signing(_) | AuthError::Hashing(_) => ApiError::unexpected(err.to_string()),
            _ => ApiError::unauthorized(err.to_string()),
        };
        api.with_detail(&err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::unexpected(format!("Response serialization failed: {err}")).with_detail(&err)
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        ApiError::unexpected(err.to_string()).with_detail(&err)
    }
}

// =============================================================================
// Response Rendering
// =============================================================================

/// Failure envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorBody {
    fn new(status: StatusCode, message: String, stack: Option<String>) -> Self {
        ErrorBody {
            status: if status.is_server_error() { "error" } else { "fail" },
            status_code: status.as_u16(),
            message,
            stack,
        }
    }
}

/// Real message and debug chain, carried on the response for
/// [`expose_error_details`].
#[derive(Debug, Clone)]
struct ErrorDetail {
    message: String,
    stack: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let stack = self.detail.unwrap_or_else(|| format!("{:?}", self.code));

        if status.is_server_error() {
            error!(status = status.as_u16(), message = %self.message, %stack, "Request failed");
        } else {
            warn!(status = status.as_u16(), message = %self.message, "Request rejected");
        }
        let public_message = if self.hidden {
            GENERIC_MESSAGE.to_string()
        } else {
            self.message.clone()
        };

        let mut response =
            (status, Json(ErrorBody::new(status, public_message, None))).into_response();
        response.extensions_mut().insert(ErrorDetail {
            message: self.message,
            stack,
        });
        response
    }
}

/// Development-only layer: failure bodies carry the real message and a
/// `stack` field.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<ErrorDetail>() {
        Some(detail) => {
            let status = response.status();
            let body = ErrorBody::new(status, detail.message, Some(detail.stack));
            (status, Json(body)).into_response()
        }
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_core::{ValidationError, ValidationErrors};

    #[test]
    fn test_db_error_statuses() {
        let err: ApiError = DbError::not_found("Vendor", 9).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Vendor not found");

        let err: ApiError = DbError::rejected("Cannot delete vendor with associated materials or purchases").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = DbError::StaleVersion.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.message, "Inventory record was modified by another request");

        let err: ApiError = DbError::TransactionFailed("create employee: boom".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = DbError::Duplicate {
            column: "people_or_organization.email".into(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Duplicate value");
        assert!(err.detail.as_deref().unwrap().contains("people_or_organization.email"));

        let err: ApiError = DbError::PoolExhausted.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.hidden);
    }

    #[test]
    fn test_core_error_statuses() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::Required {
            label: "Material name".to_string(),
        });
        let err: ApiError = CoreError::Validation(errors).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Material name is required");

        let err: ApiError = CoreError::SchemaNotFound("vendors.archive".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Validation schema 'vendors.archive' not found");
        assert!(!err.hidden);
    }

    #[test]
    fn test_auth_error_statuses() {
        let err: ApiError = AuthError::MissingToken.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let err: ApiError = AuthError::Forbidden.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_envelope_status_word() {
        let body = ErrorBody::new(StatusCode::NOT_FOUND, "Order not found".into(), None);
        assert_eq!(body.status, "fail");
        let body = ErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.into(), None);
        assert_eq!(body.status, "error");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 500);
        assert!(json.get("stack").is_none());
    }
}
