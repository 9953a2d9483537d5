//! Request validation
//!
//! Provides a `ValidatedJson` extractor that validates request bodies using the validator crate.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::error::ErrorResponse;

/// Validation error type
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] JsonRejection),
    #[error("{0}")]
    ValidationFailed(String),
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::JsonError(e) => e.body_text(),
            Self::ValidationFailed(msg) => msg,
        };

        let body = ErrorResponse {
            error: message,
            code: "validation_error".to_string(),
        };

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Join field messages, falling back to the validator code when a rule has no message
fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .map(|error| {
            error
                .message
                .as_ref()
                .map_or_else(|| error.code.to_string(), ToString::to_string)
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// A JSON extractor that also validates the request body
///
/// Malformed JSON, a missing JSON content type and failed validation rules
/// are all rejected with `400 Bad Request`.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct SynthesizeRequest {
///     #[validate(length(min = 1, message = "Content cannot be empty"))]
///     content: String,
/// }
///
/// async fn handler(ValidatedJson(req): ValidatedJson<SynthesizeRequest>) {
///     // req is validated
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;

        value
            .validate()
            .map_err(|e| ValidationError::ValidationFailed(describe(&e)))?;

        Ok(Self(value))
    }
}
