//! Streaming speech gateway over WebSocket
//!
//! Implements the synthesis and recognition session ports against an
//! NLS-style gateway. Every session opens its own WebSocket, authenticates
//! with the `X-NLS-Token` header and exchanges JSON control messages; audio
//! travels as binary frames in both directions.
//!
//! Token issuance and refresh happen outside this service. The configured
//! token is used as is.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::SpeechConfig;
use crate::error::SpeechError;
use crate::ports::{
    EventSender, RecognitionParams, RecognitionSession, SessionEvent, SpeechProvider,
    SynthesisParams, SynthesisSession,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const TOKEN_HEADER: &str = "X-NLS-Token";
const SYNTHESIZER: &str = "SpeechSynthesizer";
const TRANSCRIBER: &str = "SpeechTranscriber";

/// Speech provider backed by the streaming gateway
#[derive(Debug, Clone)]
pub struct NlsSpeechProvider {
    config: Arc<SpeechConfig>,
}

impl NlsSpeechProvider {
    /// Create a new gateway provider
    ///
    /// No connection is made until a session starts.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if the configuration is invalid.
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Configuration)?;
        Ok(Self {
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl SpeechProvider for NlsSpeechProvider {
    async fn synthesis_session(&self) -> Result<Box<dyn SynthesisSession>, SpeechError> {
        Ok(Box::new(NlsSynthesisSession {
            config: Arc::clone(&self.config),
            link: None,
        }))
    }

    async fn recognition_session(&self) -> Result<Box<dyn RecognitionSession>, SpeechError> {
        Ok(Box::new(NlsRecognitionSession {
            config: Arc::clone(&self.config),
            link: None,
        }))
    }

    fn name(&self) -> &str {
        "nls"
    }
}

/// Outgoing control message
#[derive(Debug, Serialize)]
struct Command<'a, P> {
    header: CommandHeader<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<P>,
}

#[derive(Debug, Serialize)]
struct CommandHeader<'a> {
    message_id: String,
    task_id: &'a str,
    namespace: &'a str,
    name: &'a str,
    appkey: &'a str,
}

#[derive(Debug, Serialize)]
struct SynthesisPayload<'a> {
    text: &'a str,
    voice: &'a str,
    format: &'static str,
    sample_rate: u32,
    volume: u8,
    speech_rate: i16,
    pitch_rate: i16,
}

#[derive(Debug, Serialize)]
struct TranscriptionPayload {
    format: &'static str,
    sample_rate: u32,
    enable_intermediate_result: bool,
    enable_punctuation_prediction: bool,
    enable_inverse_text_normalization: bool,
}

/// Incoming event message
#[derive(Debug, Deserialize)]
struct ServerEvent {
    header: ServerEventHeader,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ServerEventHeader {
    name: String,
    #[serde(default)]
    status: Option<u32>,
    #[serde(default)]
    status_text: Option<String>,
}

/// Identifier in the 32-hex-digit form the gateway expects
fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Translate a JSON control message into a session event
///
/// Returns `None` for messages that carry nothing the orchestrator uses.
fn translate(text: &str) -> Option<SessionEvent> {
    let event: ServerEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Unparseable gateway message");
            return None;
        },
    };

    let result = || {
        event
            .payload
            .get("result")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let status_text = || {
        event.header.status_text.clone().unwrap_or_else(|| {
            event
                .header
                .status
                .map_or_else(String::new, |status| format!("status {status}"))
        })
    };

    match event.header.name.as_str() {
        "TranscriptionStarted" | "SynthesisStarted" => Some(SessionEvent::Started),
        "MetaInfo" => Some(SessionEvent::MetaInfo(event.payload.to_string())),
        "SentenceBegin" => Some(SessionEvent::SentenceBegin(event.payload.to_string())),
        "TranscriptionResultChanged" => Some(SessionEvent::ResultChanged(result())),
        "SentenceEnd" => Some(SessionEvent::SentenceEnd(result())),
        "SynthesisCompleted" | "TranscriptionCompleted" => {
            Some(SessionEvent::Completed(status_text()))
        },
        "TaskFailed" => Some(SessionEvent::Error(status_text())),
        other => {
            debug!(name = other, "Ignoring gateway message");
            None
        },
    }
}

async fn connect(config: &SpeechConfig) -> Result<WsStream, SpeechError> {
    let mut request = config.endpoint.as_str().into_client_request()?;
    let token = HeaderValue::from_str(config.token())
        .map_err(|e| SpeechError::Configuration(format!("Invalid access token: {e}")))?;
    request.headers_mut().insert(TOKEN_HEADER, token);

    let (stream, response) = tokio::time::timeout(config.start_timeout(), connect_async(request))
        .await
        .map_err(|_| {
            SpeechError::ConnectionFailed(format!(
                "connect to {} timed out after {}ms",
                config.endpoint, config.start_timeout_ms
            ))
        })??;

    debug!(endpoint = %config.endpoint, status = %response.status(), "Connected to speech gateway");
    Ok(stream)
}

async fn send_command<P: Serialize + Send>(
    sink: &mut WsSink,
    config: &SpeechConfig,
    task_id: &str,
    namespace: &str,
    name: &str,
    payload: Option<P>,
) -> Result<(), SpeechError> {
    let command = Command {
        header: CommandHeader {
            message_id: new_id(),
            task_id,
            namespace,
            name,
            appkey: config.appkey(),
        },
        payload,
    };
    let json = serde_json::to_string(&command)
        .map_err(|e| SpeechError::RequestFailed(format!("Failed to encode {name}: {e}")))?;
    sink.send(Message::text(json)).await?;
    Ok(())
}

/// Forward everything the gateway says until a terminal event
async fn forward_events(mut source: WsSource, events: EventSender) {
    while let Some(message) = source.next().await {
        let event = match message {
            Ok(Message::Binary(data)) => SessionEvent::AudioData(data),
            Ok(Message::Text(text)) => match translate(text.as_str()) {
                Some(event) => event,
                None => continue,
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Gateway closed the connection");
                SessionEvent::Closed
            },
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "WebSocket read failed");
                SessionEvent::Closed
            },
        };

        let terminal = event.is_terminal();
        if events.send(event).is_err() || terminal {
            return;
        }
    }

    let _ = events.send(SessionEvent::Closed);
}

/// Wait for the gateway to accept a transcription task
async fn await_started(source: &mut WsSource, config: &SpeechConfig) -> Result<(), SpeechError> {
    tokio::time::timeout(config.start_timeout(), read_until_started(source))
        .await
        .map_err(|_| SpeechError::Timeout(config.start_timeout_ms))?
}

async fn read_until_started(source: &mut WsSource) -> Result<(), SpeechError> {
    while let Some(message) = source.next().await {
        match message? {
            Message::Text(text) => match translate(text.as_str()) {
                Some(SessionEvent::Started) => return Ok(()),
                Some(SessionEvent::Error(detail)) => {
                    return Err(SpeechError::SessionFailed(format!(
                        "gateway rejected the task: {detail}"
                    )));
                },
                other => debug!(?other, "Ignoring message before start"),
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    Err(SpeechError::ConnectionFailed(
        "connection closed before transcription started".to_string(),
    ))
}

/// One live connection: the write half plus the task reading the other half
struct Link {
    sink: Option<WsSink>,
    task_id: String,
    reader: JoinHandle<()>,
}

impl Link {
    fn new(sink: WsSink, task_id: String, reader: JoinHandle<()>) -> Self {
        Self {
            sink: Some(sink),
            task_id,
            reader,
        }
    }

    fn parts(&mut self) -> Result<(&mut WsSink, &str), SpeechError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| SpeechError::SessionFailed("connection already closed".to_string()))?;
        Ok((sink, &self.task_id))
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();

        // Send a Close frame so the gateway sees a clean shutdown.
        let (Some(mut sink), Ok(runtime)) = (self.sink.take(), Handle::try_current()) else {
            return;
        };
        let task_id = std::mem::take(&mut self.task_id);
        runtime.spawn(async move {
            if let Err(e) = sink.close().await {
                debug!(%task_id, error = %e, "Failed to close gateway connection");
            }
        });
    }
}

/// Synthesis over one gateway connection
struct NlsSynthesisSession {
    config: Arc<SpeechConfig>,
    link: Option<Link>,
}

#[async_trait]
impl SynthesisSession for NlsSynthesisSession {
    #[instrument(skip_all, fields(text_len = params.text.len(), voice = %params.voice))]
    async fn start(
        &mut self,
        params: &SynthesisParams,
        events: EventSender,
    ) -> Result<(), SpeechError> {
        let (mut sink, source) = connect(&self.config).await?.split();
        let task_id = new_id();

        let payload = SynthesisPayload {
            text: &params.text,
            voice: &params.voice,
            format: "pcm",
            sample_rate: params.spec.sample_rate,
            volume: params.volume,
            speech_rate: params.speech_rate,
            pitch_rate: params.pitch_rate,
        };
        send_command(
            &mut sink,
            &self.config,
            &task_id,
            SYNTHESIZER,
            "StartSynthesis",
            Some(payload),
        )
        .await?;
        debug!(%task_id, "Synthesis started");

        let reader = tokio::spawn(forward_events(source, events));
        self.link = Some(Link::new(sink, task_id, reader));
        Ok(())
    }
}

/// Recognition over one gateway connection
struct NlsRecognitionSession {
    config: Arc<SpeechConfig>,
    link: Option<Link>,
}

impl NlsRecognitionSession {
    fn link(&mut self) -> Result<&mut Link, SpeechError> {
        self.link
            .as_mut()
            .ok_or_else(|| SpeechError::SessionFailed("recognition session not started".to_string()))
    }
}

#[async_trait]
impl RecognitionSession for NlsRecognitionSession {
    #[instrument(skip_all, fields(sample_rate = params.spec.sample_rate))]
    async fn start(
        &mut self,
        params: &RecognitionParams,
        events: EventSender,
    ) -> Result<(), SpeechError> {
        let (mut sink, mut source) = connect(&self.config).await?.split();
        let task_id = new_id();

        let payload = TranscriptionPayload {
            format: "pcm",
            sample_rate: params.spec.sample_rate,
            enable_intermediate_result: params.enable_intermediate_result,
            enable_punctuation_prediction: params.enable_punctuation_prediction,
            enable_inverse_text_normalization: params.enable_inverse_text_normalization,
        };
        send_command(
            &mut sink,
            &self.config,
            &task_id,
            TRANSCRIBER,
            "StartTranscription",
            Some(payload),
        )
        .await?;

        await_started(&mut source, &self.config).await?;
        debug!(%task_id, "Transcription started");
        let _ = events.send(SessionEvent::Started);

        let reader = tokio::spawn(forward_events(source, events));
        self.link = Some(Link::new(sink, task_id, reader));
        Ok(())
    }

    async fn send_audio(&mut self, frame: Bytes) -> Result<(), SpeechError> {
        let (sink, _) = self.link()?.parts()?;
        sink.send(Message::binary(frame)).await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SpeechError> {
        let config = Arc::clone(&self.config);
        let (sink, task_id) = self.link()?.parts()?;
        send_command::<()>(
            sink,
            &config,
            task_id,
            TRANSCRIBER,
            "StopTranscription",
            None,
        )
        .await
    }
}
