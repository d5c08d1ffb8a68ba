//! Error types for Airtrack server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchEntity = 4,
    BadValue = 5,
    AlreadyBound = 6,
    DuplicateType = 7,
    Conflict = 8,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Equipment already bound: {0}")]
    AlreadyBound(String),

    #[error("Duplicate equipment type: {0}")]
    DuplicateType(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Unique constraints whose violation is the caller's fault, with the message shown for each
const CLIENT_UNIQUE_CONSTRAINTS: &[(&str, &str)] = &[
    (
        "equipment_system_inventory_number_key",
        "Inventory number already exists",
    ),
    (
        "equipment_zamar_serial_number_key",
        "Serial number already exists",
    ),
    (
        "installations_system_identifier_key",
        "Installation identifier already exists",
    ),
];

impl AppError {
    /// True when this is a unique-constraint violation on the named constraint
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint)
            }
            _ => false,
        }
    }

    /// Turn known unique-constraint violations into client errors, leave the rest untouched
    pub fn classify_constraint(self) -> Self {
        let constraint = match &self {
            AppError::Database(sqlx::Error::Database(db))
                if db.code().as_deref() == Some("23505") =>
            {
                db.constraint().map(str::to_owned)
            }
            _ => None,
        };

        match constraint {
            Some(name) => match CLIENT_UNIQUE_CONSTRAINTS.iter().find(|(c, _)| *c == name) {
                Some((_, message)) => AppError::Validation(message.to_string()),
                None => AppError::Conflict(format!("Concurrent update rejected ({})", name)),
            },
            None => self,
        }
    }

    fn parts(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchEntity),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::AlreadyBound(_) => (StatusCode::CONFLICT, ErrorCode::AlreadyBound),
            AppError::DuplicateType(_) => (StatusCode::CONFLICT, ErrorCode::DuplicateType),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::AlreadyBound(msg)
            | AppError::DuplicateType(msg)
            | AppError::Conflict(msg) => msg.clone(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
