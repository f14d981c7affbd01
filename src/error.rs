//! Error types and Axum response conversions.
//!
//! Authentication failures of every kind collapse into the same
//! `401 Unauthorized` body; the detail only reaches the server log.

use crate::auth::token::TokenError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Body sent with every 401.
pub const UNAUTHORIZED: &str = "Unauthorized";

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request body timed out")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Payload too large".to_string(),
            ),
            AppError::Unauthorized(detail) => {
                tracing::warn!(action = "unauthorized", reason = %detail, "Authentication rejected");
                (StatusCode::UNAUTHORIZED, UNAUTHORIZED.to_string())
            }
            AppError::Timeout => {
                tracing::warn!(action = "body_timeout", "Request body not received in time");
                (StatusCode::UNAUTHORIZED, UNAUTHORIZED.to_string())
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
        };

        (status, message).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(msg) => AppError::Internal(format!("Token encoding: {}", msg)),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}
