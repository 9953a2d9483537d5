//! Speech processing errors

use thiserror::Error;

/// Errors that can occur while driving a speech session
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The caller supplied unusable input (empty text, empty audio)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The session ended without producing any audio or transcript
    #[error("Provider produced no output: {0}")]
    NoOutput(String),

    /// Failed to connect to the speech service
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Sending a message to the speech service failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The session worker died before reporting an outcome
    #[error("Session failed: {0}")]
    SessionFailed(String),

    /// The speech service sent something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No terminal event arrived in time
    #[error("Speech session timeout after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SpeechError {
    /// Whether the error was caused by the caller rather than the provider
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SpeechError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::Io(e) => Self::ConnectionFailed(e.to_string()),
            WsError::Tls(e) => Self::ConnectionFailed(e.to_string()),
            WsError::Http(response) => {
                Self::ConnectionFailed(format!("handshake rejected with HTTP {}", response.status()))
            },
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Self::RequestFailed("connection already closed".to_string())
            },
            other => Self::RequestFailed(other.to_string()),
        }
    }
}
