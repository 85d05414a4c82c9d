use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Permission already assigned: {0}")]
    PermissionAlreadyAssigned(String),

    #[error("Permission not found in group: {0}")]
    PermissionNotFoundInGroup(String),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidRequestBody(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error_message) = match self {
            AppError::InvalidRequestBody(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "Token has expired".to_string(),
            ),
            AppError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            AppError::Conflict(err) => (StatusCode::CONFLICT, err.to_string()),
            AppError::PermissionAlreadyAssigned(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PermissionNotFoundInGroup(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::InternalError(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                AppError::InvalidToken("bad".to_string()).into_response(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::TokenExpired.into_response(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::NotFound(anyhow::anyhow!("missing")).into_response(),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Conflict(anyhow::anyhow!("taken")).into_response(),
                StatusCode::CONFLICT,
            ),
            (
                AppError::PermissionAlreadyAssigned("dup".to_string()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::PermissionNotFoundInGroup("absent".to_string()).into_response(),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::InternalError(anyhow::anyhow!("boom")).into_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (response, expected) in cases {
            assert_eq!(response.status(), expected);
        }
    }
}
