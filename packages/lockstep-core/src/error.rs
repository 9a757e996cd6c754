//! Centralized error types for the Lockstep core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::channel::ChannelError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for ChannelError {
    fn code(&self) -> &'static str {
        match self {
            Self::RoomFull(_) => "room_full",
            Self::NotJoined => "not_joined",
            Self::Closed => "channel_closed",
        }
    }
}

/// Application-wide error type for the Lockstep library.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum LockstepError {
    /// Joining the session channel failed (after any configured retries).
    #[error("Channel join failed: {0}")]
    Join(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested session/topic does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session configuration failed validation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LockstepError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Join(_) => "join_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ChannelError> for LockstepError {
    fn from(err: ChannelError) -> Self {
        Self::Join(err.to_string())
    }
}

/// Convenient Result alias for application-wide operations.
pub type LockstepResult<T> = Result<T, LockstepError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for LockstepError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
