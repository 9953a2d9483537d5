//! Request ID propagation
//!
//! Every request runs inside an `http_request` span carrying a request id.
//! A well-formed `X-Request-Id` from the caller is reused; anything else is
//! replaced with a fresh time-ordered UUID. The id is echoed on the response.

use axum::{
    extract::Request,
    http::header::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// The header name for the request ID
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Longest caller-supplied id that is accepted
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID taken from the caller or generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    fn from_header(value: &HeaderValue) -> Option<Self> {
        let value = value.to_str().ok()?.trim();
        let acceptable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware function; install with `axum::middleware::from_fn`
pub async fn propagate_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri().path(),
    );

    let header = HeaderValue::from_str(request_id.as_str()).ok();
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).instrument(span).await;
    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
