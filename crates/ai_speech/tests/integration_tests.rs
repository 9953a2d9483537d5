//! Integration tests for ai_speech crate
//!
//! Runs full synthesis and recognition sessions against an in-process
//! WebSocket gateway that speaks the same control protocol.

use std::sync::Arc;
use std::time::Duration;

use ai_speech::{
    AudioFormat, NlsSpeechProvider, SessionOrchestrator, SpeechConfig, SpeechError, WavHeader,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// How the fake gateway answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Normal,
    FailSynthesis,
    RejectTranscription,
    Silent,
}

/// What the fake gateway observed
#[derive(Debug, Default)]
struct Seen {
    tokens: Vec<String>,
    commands: Vec<Value>,
    audio_bytes: usize,
    audio_frames: usize,
    closes: usize,
}

struct MockGateway {
    url: String,
    seen: Arc<Mutex<Seen>>,
}

impl MockGateway {
    async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/v1", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Seen::default()));

        let state = Arc::clone(&seen);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, script, Arc::clone(&state)));
            }
        });

        Self { url, seen }
    }

    /// Wait briefly for the client to close its connections
    async fn wait_for_closes(&self, expected: usize) -> usize {
        for _ in 0..100 {
            let closes = self.seen.lock().closes;
            if closes >= expected {
                return closes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.seen.lock().closes
    }

    fn command_names(&self) -> Vec<String> {
        self.seen
            .lock()
            .commands
            .iter()
            .map(|c| c["header"]["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

fn event(name: &str, status_text: &str, payload: Value) -> Message {
    Message::text(
        json!({
            "header": {
                "name": name,
                "status": 20_000_000,
                "status_text": status_text,
            },
            "payload": payload,
        })
        .to_string(),
    )
}

async fn serve(stream: TcpStream, script: Script, seen: Arc<Mutex<Seen>>) {
    let handshake_seen = Arc::clone(&seen);
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if let Some(token) = request.headers().get("X-NLS-Token") {
            handshake_seen
                .lock()
                .tokens
                .push(token.to_str().unwrap_or_default().to_string());
        }
        Ok(response)
    };

    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
        return;
    };

    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => {
                let command: Value = serde_json::from_str(text.as_str()).unwrap();
                let name = command["header"]["name"].as_str().unwrap_or_default().to_string();
                seen.lock().commands.push(command);

                let replies = match (name.as_str(), script) {
                    ("StartSynthesis", Script::Normal) => vec![
                        event("MetaInfo", "", json!({"subtitles": []})),
                        Message::binary(Bytes::from_static(&[1, 2])),
                        Message::binary(Bytes::from_static(&[3, 4])),
                        event("SynthesisCompleted", "Gateway:SUCCESS:Success.", json!({})),
                    ],
                    ("StartSynthesis", Script::FailSynthesis)
                    | ("StartTranscription", Script::RejectTranscription) => {
                        vec![event("TaskFailed", "Gateway:ACCESS_DENIED", json!({}))]
                    },
                    ("StartTranscription", _) => {
                        vec![event("TranscriptionStarted", "", json!({}))]
                    },
                    ("StopTranscription", Script::Normal) => {
                        let (frames, bytes) = {
                            let seen = seen.lock();
                            (seen.audio_frames, seen.audio_bytes)
                        };
                        vec![
                            event("SentenceBegin", "", json!({"index": 1})),
                            event("TranscriptionResultChanged", "", json!({"result": "frames"})),
                            event("SentenceEnd", "", json!({"result": format!("{frames} frames,")})),
                            event("SentenceEnd", "", json!({"result": format!("{bytes} bytes.")})),
                            event("TranscriptionCompleted", "Gateway:SUCCESS:Success.", json!({})),
                        ]
                    },
                    _ => Vec::new(),
                };

                for reply in replies {
                    if ws.send(reply).await.is_err() {
                        return;
                    }
                }
            },
            Message::Binary(data) => {
                let mut seen = seen.lock();
                seen.audio_frames += 1;
                seen.audio_bytes += data.len();
            },
            Message::Close(_) => {
                seen.lock().closes += 1;
                break;
            },
            _ => {},
        }
    }
}

fn config(endpoint: &str) -> SpeechConfig {
    SpeechConfig {
        endpoint: endpoint.to_string(),
        token: Some(SecretString::from("test-token")),
        appkey: Some("test-appkey".to_string()),
        frame_interval_ms: 0,
        session_timeout_ms: 2_000,
        start_timeout_ms: 1_000,
        ..SpeechConfig::default()
    }
}

fn orchestrator(config: SpeechConfig) -> SessionOrchestrator {
    let provider = NlsSpeechProvider::new(config.clone()).unwrap();
    SessionOrchestrator::new(Arc::new(provider), config).unwrap()
}

// ============ Synthesis ============

#[tokio::test]
async fn synthesis_returns_wav_of_streamed_audio() {
    let gateway = MockGateway::start(Script::Normal).await;
    let orchestrator = orchestrator(config(&gateway.url));

    let wav = orchestrator.synthesize("你好").await.unwrap();

    assert_eq!(wav.format(), AudioFormat::Wav);
    let (header, payload) = WavHeader::parse(wav.data()).unwrap();
    assert_eq!(payload, &[1, 2, 3, 4]);
    assert_eq!(header.sample_rate, 16000);
    assert_eq!(header.data_len, 4);
}

#[tokio::test]
async fn synthesis_sends_token_and_start_command() {
    let gateway = MockGateway::start(Script::Normal).await;
    let orchestrator = orchestrator(config(&gateway.url));

    orchestrator.synthesize("hello").await.unwrap();

    let seen = gateway.seen.lock();
    assert_eq!(seen.tokens, vec!["test-token".to_string()]);
    let start = &seen.commands[0];
    assert_eq!(start["header"]["namespace"], "SpeechSynthesizer");
    assert_eq!(start["header"]["name"], "StartSynthesis");
    assert_eq!(start["header"]["appkey"], "test-appkey");
    assert_eq!(start["header"]["task_id"].as_str().unwrap().len(), 32);
    assert_eq!(start["payload"]["text"], "hello");
    assert_eq!(start["payload"]["voice"], "ailun");
    assert_eq!(start["payload"]["format"], "pcm");
    assert_eq!(start["payload"]["sample_rate"], 16000);
}

#[tokio::test]
async fn synthesis_task_failure_is_no_output() {
    let gateway = MockGateway::start(Script::FailSynthesis).await;
    let orchestrator = orchestrator(config(&gateway.url));

    let err = orchestrator.synthesize("hello").await.unwrap_err();

    assert!(matches!(err, SpeechError::NoOutput(ref detail) if detail.contains("ACCESS_DENIED")));
}

#[tokio::test]
async fn silent_gateway_times_out() {
    let gateway = MockGateway::start(Script::Silent).await;
    let orchestrator = orchestrator(SpeechConfig {
        session_timeout_ms: 200,
        ..config(&gateway.url)
    });

    let err = orchestrator.synthesize("hello").await.unwrap_err();

    assert!(matches!(err, SpeechError::Timeout(200)));
}

#[tokio::test]
async fn unreachable_gateway_is_connection_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws/v1", listener.local_addr().unwrap());
    drop(listener);
    let orchestrator = orchestrator(config(&url));

    let err = orchestrator.synthesize("hello").await.unwrap_err();

    assert!(matches!(err, SpeechError::ConnectionFailed(_)));
}

// ============ Recognition ============

#[tokio::test]
async fn recognition_streams_frames_and_joins_sentences() {
    let gateway = MockGateway::start(Script::Normal).await;
    let orchestrator = orchestrator(config(&gateway.url));

    let transcript = orchestrator
        .recognize(Bytes::from(vec![0u8; 640 * 3 + 100]))
        .await
        .unwrap();

    assert_eq!(transcript.text(), "3 frames,1920 bytes.");
    assert_eq!(
        gateway.command_names(),
        vec!["StartTranscription", "StopTranscription"]
    );

    let seen = gateway.seen.lock();
    let start = &seen.commands[0];
    assert_eq!(start["header"]["namespace"], "SpeechTranscriber");
    assert_eq!(start["payload"]["format"], "pcm");
    assert_eq!(start["payload"]["enable_intermediate_result"], true);
    assert_eq!(start["payload"]["enable_punctuation_prediction"], true);
    assert_eq!(
        start["header"]["task_id"],
        seen.commands[1]["header"]["task_id"]
    );
}

#[tokio::test]
async fn recognition_rejected_at_start_fails_session() {
    let gateway = MockGateway::start(Script::RejectTranscription).await;
    let orchestrator = orchestrator(config(&gateway.url));

    let err = orchestrator
        .recognize(Bytes::from(vec![0u8; 640]))
        .await
        .unwrap_err();

    assert!(matches!(err, SpeechError::SessionFailed(ref detail) if detail.contains("ACCESS_DENIED")));
    assert_eq!(gateway.seen.lock().audio_bytes, 0);
}

#[tokio::test]
async fn recognition_without_final_result_times_out() {
    let gateway = MockGateway::start(Script::Silent).await;
    let orchestrator = orchestrator(SpeechConfig {
        session_timeout_ms: 300,
        ..config(&gateway.url)
    });

    let err = orchestrator
        .recognize(Bytes::from(vec![0u8; 1280]))
        .await
        .unwrap_err();

    assert!(matches!(err, SpeechError::Timeout(300)));
}

#[tokio::test]
async fn finished_sessions_close_their_connections() {
    let gateway = MockGateway::start(Script::Normal).await;
    let orchestrator = orchestrator(config(&gateway.url));

    orchestrator.synthesize("你好").await.unwrap();
    orchestrator
        .recognize(Bytes::from(vec![0u8; 640 * 2]))
        .await
        .unwrap();

    assert_eq!(gateway.wait_for_closes(2).await, 2);
}
