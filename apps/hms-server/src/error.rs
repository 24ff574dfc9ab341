//! # API Errors
//!
//! Every handler returns `Result<_, ApiError>`. The conversion from store
//! and domain errors happens here and nowhere else.
//!
//! ## Mapping
//! ```text
//! ┌──────────────────────────────────┬────────┬──────────────────────────┐
//! │ Source                           │ Status │ code                     │
//! ├──────────────────────────────────┼────────┼──────────────────────────┤
//! │ ValidationError, bad JSON/query  │  400   │ VALIDATION_ERROR         │
//! │ InvalidLedgerEntry               │  400   │ VALIDATION_ERROR         │
//! │ Item/Patient/UserNotFound        │  404   │ NOT_FOUND                │
//! │ InvalidCredentials               │  401   │ INVALID_CREDENTIALS      │
//! │ InsufficientStock                │  400   │ INSUFFICIENT_STOCK       │
//! │ DuplicateItem                    │  400   │ DUPLICATE_ITEM           │
//! │ DbError (anything)               │  500   │ INTERNAL (logged only)   │
//! └──────────────────────────────────┴────────┴──────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use hms_core::{CoreError, ValidationError};
use hms_db::StoreError;

/// Message returned for every internal failure.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    InvalidCredentials,
    InsufficientStock,
    DuplicateItem,
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::InsufficientStock => StatusCode::BAD_REQUEST,
            ErrorCode::DuplicateItem => StatusCode::BAD_REQUEST,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error ready to be sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    code: ErrorCode,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Generic 500. The detail goes to the log, never to the caller.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Request failed");
        Self::new(ErrorCode::Internal, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
            code: self.code,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ItemNotFound(_) | CoreError::PatientNotFound(_) | CoreError::UserNotFound(_) => {
                ErrorCode::NotFound
            }
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::DuplicateItem(_) => ErrorCode::DuplicateItem,
            CoreError::InvalidCredentials => ErrorCode::InvalidCredentials,
            CoreError::InvalidLedgerEntry(_) | CoreError::Validation(_) => ErrorCode::ValidationError,
        };

        let message = match err {
            // Drop the "Validation error: " prefix, the code already says so.
            CoreError::Validation(inner) => inner.to_string(),
            other => other.to_string(),
        };

        ApiError::new(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(e) => e.into(),
            StoreError::Database(e) => ApiError::internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
