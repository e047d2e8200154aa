//! Error types for Liber server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    BookUnavailable = 6,
    AlreadyBorrowed = 7,
    MaxBorrowsReached = 8,
    NotBorrowed = 9,
    Duplicate = 10,
    BadValue = 11,
}

/// Main application error type
///
/// The borrowing engine only ever returns variants from this closed set;
/// storage-engine details stay behind the `Database` variant.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Book not found")]
    BookNotFound,

    #[error("Book is not available")]
    BookUnavailable,

    #[error("Book is already borrowed by this user")]
    AlreadyBorrowed,

    #[error("Maximum number of active borrows reached")]
    BorrowLimitReached,

    #[error("Book is not currently borrowed by this user")]
    NotBorrowed,

    #[error("Email address is already registered")]
    EmailTaken,

    #[error("Book has active borrows")]
    BookInUse,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
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

impl AppError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, ErrorCode::NoSuchUser),
            AppError::BookNotFound => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::BookUnavailable => (StatusCode::CONFLICT, ErrorCode::BookUnavailable),
            AppError::AlreadyBorrowed => (StatusCode::CONFLICT, ErrorCode::AlreadyBorrowed),
            AppError::BorrowLimitReached => (StatusCode::CONFLICT, ErrorCode::MaxBorrowsReached),
            AppError::NotBorrowed => (StatusCode::CONFLICT, ErrorCode::NotBorrowed),
            AppError::EmailTaken => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::BookInUse => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(
            AppError::UserNotFound.status_and_code().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BookNotFound.status_and_code().0,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn conflict_variants_map_to_409() {
        for err in [
            AppError::BookUnavailable,
            AppError::AlreadyBorrowed,
            AppError::BorrowLimitReached,
            AppError::NotBorrowed,
            AppError::EmailTaken,
            AppError::BookInUse,
        ] {
            assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);
        }
    }

    #[test]
    fn store_failures_map_to_500() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(
            err.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure)
        );
    }

    #[test]
    fn conflict_codes_are_distinct() {
        assert_ne!(
            AppError::BookUnavailable.status_and_code().1,
            AppError::AlreadyBorrowed.status_and_code().1
        );
        assert_ne!(
            AppError::AlreadyBorrowed.status_and_code().1,
            AppError::BorrowLimitReached.status_and_code().1
        );
    }
}
