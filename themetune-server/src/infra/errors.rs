//! Error type returned by the theme song handlers.
//!
//! Every failure is answered with `{"error": {"message", "status"}}`.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::task::JoinError;
use tracing::error;

use themetune_core::ThemeError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    message: &'a str,
    status: u16,
}

impl AppError {
    fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            error: ErrorDetail {
                message: &self.message,
                status: self.status.as_u16(),
            },
        };
        (self.status, Json(envelope)).into_response()
    }
}

impl From<ThemeError> for AppError {
    fn from(err: ThemeError) -> Self {
        match err {
            ThemeError::NotFound(msg) => Self::not_found(msg),
            ThemeError::InvalidInput(msg) => Self::bad_request(msg),
            // A rejected settings save is reported to the configuration UI.
            err @ ThemeError::Persistence(_) => {
                Self::bad_request(format!("Error saving configuration: {err}"))
            }
            err => {
                error!(error = %err, "Theme song request failed");
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<JoinError> for AppError {
    fn from(err: JoinError) -> Self {
        error!(error = %err, "Blocking theme song task failed");
        Self::internal("Background task failed")
    }
}
