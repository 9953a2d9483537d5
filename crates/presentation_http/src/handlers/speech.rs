//! Synthesis and recognition handlers

use std::convert::Infallible;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::{error::ApiError, middleware::ValidatedJson, state::AppState};

/// Multipart field carrying the uploaded PCM
pub const UPLOAD_FIELD: &str = "file";

/// Size of each chunk of a streamed WAV response
const STREAM_CHUNK_SIZE: usize = 16 * 1024;

/// Synthesis request
#[derive(Debug, Deserialize, Validate)]
pub struct SynthesizeRequest {
    /// Text to speak
    #[serde(default)]
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,
}

/// Recognition response
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizeResponse {
    /// Recognized text, all sentences joined
    pub content: String,
}

/// Synthesize speech and stream it back as WAV
#[instrument(skip(state, request), fields(content_len = request.content.len()))]
pub async fn synthesize(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SynthesizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = state
        .orchestrator
        .synthesize(&request.content)
        .await
        .map_err(|e| ApiError::from_speech(e, "Failed to synthesize speech"))?;

    info!(bytes = audio.size_bytes(), "Streaming synthesized audio");

    let content_type = audio.mime_type();
    let body = Bytes::from(audio.into_data());
    let chunks: Vec<Result<Bytes, Infallible>> = (0..body.len())
        .step_by(STREAM_CHUNK_SIZE)
        .map(|start| Ok(body.slice(start..body.len().min(start + STREAM_CHUNK_SIZE))))
        .collect();

    Ok((
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(futures::stream::iter(chunks)),
    ))
}

/// Recognize uploaded PCM
///
/// Accepts `multipart/form-data` with a `file` field, or the PCM as the raw
/// request body.
#[instrument(skip(state, request))]
pub async fn recognize(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<RecognizeResponse>, ApiError> {
    let pcm = read_upload(request).await?;
    if pcm.is_empty() {
        return Err(ApiError::BadRequest("Audio data is empty".to_string()));
    }

    debug!(bytes = pcm.len(), "Received audio upload");

    let transcript = state
        .orchestrator
        .recognize(pcm)
        .await
        .map_err(|e| ApiError::from_speech(e, "Failed to recognize speech"))?;

    Ok(Json(RecognizeResponse {
        content: transcript.text(),
    }))
}

async fn read_upload(request: Request) -> Result<Bytes, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if !is_multipart {
        return Bytes::from_request(request, &())
            .await
            .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()));
        }
    }

    Err(ApiError::BadRequest(format!(
        "Missing '{UPLOAD_FIELD}' field in multipart upload"
    )))
}
