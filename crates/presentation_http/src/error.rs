//! API error handling
//!
//! Provider failures are logged where they are converted and reach the
//! client only as a fixed, generic message.

use ai_speech::SpeechError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
}

impl ApiError {
    /// Convert a speech failure, logging the detail the client will not see
    ///
    /// `public_message` is the only text returned for provider failures.
    pub fn from_speech(err: SpeechError, public_message: &str) -> Self {
        match err {
            SpeechError::InvalidInput(msg) => Self::BadRequest(msg),
            SpeechError::Timeout(ms) => {
                warn!(timeout_ms = ms, "{public_message}: session timed out");
                Self::GatewayTimeout(format!("{public_message}: no result within {ms}ms"))
            },
            other => {
                error!(error = %other, "{public_message}");
                Self::Internal(public_message.to_string())
            },
        }
    }

    /// Convert an extractor rejection, keeping its status when the body was too large
    pub fn from_rejection(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(message)
        } else {
            Self::BadRequest(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg),
            Self::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
