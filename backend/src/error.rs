use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{ErrorBody, FieldViolation};
use thiserror::Error;

use crate::token::CredentialError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Input validation failed")]
    ValidationError(Vec<FieldViolation>),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid login name or secret")]
    InvalidLogin,

    #[error("{0}")]
    Credential(#[from] CredentialError),

    #[error("Resource not found")]
    NotFound,

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidLogin | AppError::Credential(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable kind placed in the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "ValidationError",
            AppError::Conflict(_) => "Conflict",
            AppError::InvalidLogin | AppError::Credential(_) => "Unauthorized",
            AppError::NotFound => "NotFound",
            AppError::DatabaseError(_) => "StoreUnavailable",
            AppError::InternalServerError(_) => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let (message, details) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                ("Internal server error".to_string(), Vec::new())
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                ("Database error".to_string(), Vec::new())
            }
            AppError::Credential(e) => {
                tracing::warn!("Rejected credential: {:?}", e);
                (e.to_string(), Vec::new())
            }
            AppError::ValidationError(details) => ("Input validation failed".to_string(), details),
            other => (other.to_string(), Vec::new()),
        };

        let body = Json(ErrorBody {
            error: kind.to_string(),
            message,
            details,
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(vec![FieldViolation::new(
            "body",
            "malformed_json",
            rejection.body_text(),
        )])
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::InternalServerError(format!("password hashing failed: {e}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::InternalServerError(format!("blocking task failed: {e}"))
    }
}

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("database unreachable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("schema sync failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
