use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use uuid::Uuid;

use super::ApiResponse;
use crate::services::{ConflictField, IdentityError};

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    DatabaseError(String),
    InternalError(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Swaps a server-side failure for a generic client message carrying a
/// fresh correlation id; the detail is logged under the same id.
fn shield(detail: &str, client_message: &str) -> (StatusCode, String) {
    let reference = Uuid::new_v4();
    tracing::error!(%reference, detail, "Request failed server-side");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("{client_message} (reference {reference})"),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::DatabaseError(detail) => shield(&detail, "A database error occurred"),
            ApiError::InternalError(detail) => shield(&detail, "An internal error occurred"),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(format!("{err:#}"))
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::DuplicateIdentity(ConflictField::Email) => {
                Self::Conflict("email already registered".to_string())
            }
            IdentityError::DuplicateIdentity(ConflictField::Username) => {
                Self::Conflict("username already taken".to_string())
            }
            IdentityError::InvalidCredentials => {
                Self::Unauthorized("invalid email or password".to_string())
            }
            IdentityError::AccountDisabled => {
                // Collapsed into the credentials message so callers cannot
                // probe whether an account exists but is deactivated. The
                // audit trail keeps the real reason.
                tracing::warn!("Rejected operation on disabled account");
                Self::Unauthorized("invalid email or password".to_string())
            }
            IdentityError::NotFound => Self::NotFound("account not found".to_string()),
            IdentityError::Validation(msg) => Self::ValidationError(msg),
            IdentityError::Token(_) => {
                Self::Unauthorized("could not validate credentials".to_string())
            }
            IdentityError::Database(msg) => Self::DatabaseError(msg),
            IdentityError::Internal(msg) => Self::InternalError(msg),
        }
    }
}
