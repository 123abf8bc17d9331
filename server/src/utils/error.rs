use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::models::ValidationError;
use crate::repository::RepositoryError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request payload")]
    InvalidPayload(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    InvalidId(&'static str),

    #[error("Event not found")]
    NotFound,

    #[error("Request timed out")]
    Timeout,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Database unavailable")]
    Unavailable,

    /// `message` is what the client sees; `source` stays in the logs.
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: RepositoryError,
    },
}

impl AppError {
    /// Classifies a store failure. `message` is used only for failures that
    /// are neither not-found nor deadline-exceeded.
    pub fn from_repository(err: RepositoryError, message: &'static str) -> Self {
        match err {
            RepositoryError::NotFound => AppError::NotFound,
            RepositoryError::DeadlineExceeded => AppError::Timeout,
            RepositoryError::Database { .. } => AppError::Internal {
                message,
                source: err,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidId(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidId(_) => "invalid_id",
            AppError::NotFound => "not_found",
            AppError::Timeout => "timeout",
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::Unavailable => "unavailable",
            AppError::Internal { .. } => "internal_error",
        }
    }

    fn log(&self) {
        match self {
            AppError::InvalidPayload(reason) => {
                debug!(reason = %reason, "Rejected request payload");
            }
            AppError::Validation(_)
            | AppError::InvalidId(_)
            | AppError::NotFound
            | AppError::MethodNotAllowed => {
                debug!(code = self.code(), message = %self, "Client error");
            }
            AppError::Timeout => warn!("Request deadline exceeded"),
            AppError::Unavailable => warn!("Database connection not established"),
            AppError::Internal { message, source } => {
                error!(error = ?source, message = %message, "Internal error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        // Display is the public message; internal causes are only logged
        error_response(self.status_code(), self.code(), self.to_string())
    }
}
