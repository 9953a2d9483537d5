//! Session orchestration
//!
//! Bridges a callback-driven provider session to a single awaited result.
//! Each call opens its own session, runs it on a dedicated Tokio task and
//! waits on a one-shot channel for the outcome, bounded by the configured
//! session timeout. Nothing is shared between calls except the provider.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::config::SpeechConfig;
use crate::error::SpeechError;
use crate::ports::{
    RecognitionParams, RecognitionSession, SessionEvent, SpeechProvider, SynthesisParams,
    SynthesisSession, event_channel,
};
use crate::types::{AudioData, Transcript};
use crate::uploader::{FrameSink, UploadConfig, stream_frames};
use crate::wav;

/// Collected output of one session and the event that ended it
#[derive(Debug)]
struct SessionOutcome<T> {
    output: T,
    ended_by: SessionEvent,
}

/// Drives synthesis and recognition sessions against a speech provider
#[derive(Clone)]
pub struct SessionOrchestrator {
    provider: Arc<dyn SpeechProvider>,
    config: SpeechConfig,
}

impl fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("provider", &self.provider.name())
            .field("endpoint", &self.config.endpoint)
            .finish_non_exhaustive()
    }
}

impl SessionOrchestrator {
    /// Create an orchestrator for `provider`
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if the configuration is invalid.
    pub fn new(provider: Arc<dyn SpeechProvider>, config: SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Configuration)?;
        Ok(Self { provider, config })
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    #[must_use]
    pub const fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Synthesize `text` and return it as a WAV container
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `text` is blank; no session is opened
    /// - `NoOutput` if the session ends without any audio
    /// - `Timeout` if the session never reaches a terminal event
    /// - transport errors from opening or starting the session
    #[instrument(skip(self, text), fields(text_len = text.len(), provider = self.provider.name()))]
    pub async fn synthesize(&self, text: &str) -> Result<AudioData, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::InvalidInput(
                "Content cannot be empty".to_string(),
            ));
        }

        let spec = self.config.pcm_spec();
        let params = SynthesisParams {
            text: text.to_string(),
            voice: self.config.voice.clone(),
            spec,
            volume: self.config.volume,
            speech_rate: self.config.speech_rate,
            pitch_rate: self.config.pitch_rate,
        };

        let session = self.provider.synthesis_session().await?;
        let SessionOutcome { output, ended_by } =
            self.run_session(drive_synthesis(session, params), self.config.session_timeout())
                .await?;

        if output.is_empty() {
            warn!(ended_by = ?ended_by, "Synthesis produced no audio");
            return Err(SpeechError::NoOutput(describe_end(&ended_by)));
        }

        if let SessionEvent::Error(detail) = &ended_by {
            warn!(%detail, bytes = output.len(), "Synthesis failed after producing audio");
        }

        info!(bytes = output.len(), duration_ms = spec.duration_ms(output.len()), "Synthesis complete");

        Ok(wav::into_wav(AudioData::pcm(output.to_vec(), spec)))
    }

    /// Recognize headerless PCM in the configured layout
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `pcm` is empty; no session is opened
    /// - `NoOutput` if no sentence was recognized
    /// - `Timeout` if the session never reaches a terminal event
    /// - the first error raised while sending audio
    #[instrument(skip(self, pcm), fields(audio_size = pcm.len(), provider = self.provider.name()))]
    pub async fn recognize(&self, pcm: Bytes) -> Result<Transcript, SpeechError> {
        if pcm.is_empty() {
            return Err(SpeechError::InvalidInput("Audio data is empty".to_string()));
        }

        let params = RecognitionParams {
            spec: self.config.pcm_spec(),
            enable_intermediate_result: self.config.enable_intermediate_result,
            enable_punctuation_prediction: self.config.enable_punctuation_prediction,
            enable_inverse_text_normalization: self.config.enable_inverse_text_normalization,
        };

        // The paced upload happens inside the session, so its duration is added
        // to the wait for the final result.
        let upload = self.config.upload();
        let deadline = self
            .config
            .session_timeout()
            .saturating_add(upload.pacing(pcm.len()));

        let session = self.provider.recognition_session().await?;
        let SessionOutcome { output, ended_by } = self
            .run_session(drive_recognition(session, params, pcm, upload), deadline)
            .await?;

        if output.is_empty() {
            warn!(ended_by = ?ended_by, "Recognition produced no transcript");
            return Err(SpeechError::NoOutput(describe_end(&ended_by)));
        }

        info!(
            sentences = output.segments().len(),
            text_len = output.text().len(),
            "Recognition complete"
        );

        Ok(output)
    }

    /// Run a session future on its own task and wait up to `deadline` for its
    /// single outcome
    async fn run_session<T, F>(
        &self,
        session: F,
        deadline: Duration,
    ) -> Result<SessionOutcome<T>, SpeechError>
    where
        T: Send + 'static,
        F: Future<Output = Result<SessionOutcome<T>, SpeechError>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let worker = tokio::spawn(async move {
            // The receiver is gone once the caller timed out.
            let _ = done_tx.send(session.await);
        });

        match tokio::time::timeout(deadline, done_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(SpeechError::SessionFailed(
                "session worker exited without reporting".to_string(),
            )),
            Err(_) => {
                worker.abort();
                let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "Speech session did not finish in time");
                Err(SpeechError::Timeout(timeout_ms))
            },
        }
    }
}

#[async_trait]
impl FrameSink for Box<dyn RecognitionSession + '_> {
    type Error = SpeechError;

    async fn send_frame(&mut self, frame: Bytes) -> Result<(), SpeechError> {
        self.send_audio(frame).await
    }
}

async fn drive_synthesis(
    mut session: Box<dyn SynthesisSession>,
    params: SynthesisParams,
) -> Result<SessionOutcome<BytesMut>, SpeechError> {
    let (events, mut rx) = event_channel();
    session.start(&params, events).await?;

    let mut pcm = BytesMut::new();
    let ended_by = loop {
        match rx.recv().await {
            Some(SessionEvent::AudioData(chunk)) => pcm.extend_from_slice(&chunk),
            Some(SessionEvent::MetaInfo(info)) => debug!(%info, "Synthesis metainfo"),
            Some(event) if event.is_terminal() => break event,
            Some(event) => debug!(?event, "Ignoring synthesis event"),
            None => break SessionEvent::Closed,
        }
    };

    log_end("synthesis", &ended_by);
    Ok(SessionOutcome {
        output: pcm,
        ended_by,
    })
}

async fn drive_recognition(
    mut session: Box<dyn RecognitionSession>,
    params: RecognitionParams,
    pcm: Bytes,
    upload: UploadConfig,
) -> Result<SessionOutcome<Transcript>, SpeechError> {
    let (events, mut rx) = event_channel();
    session.start(&params, events).await?;

    let report = stream_frames(&pcm, &upload, &mut session).await?;
    debug!(
        frames = report.frames_sent,
        bytes_sent = report.bytes_sent,
        bytes_dropped = report.bytes_dropped,
        "Audio uploaded"
    );

    // A failed stop is a transport problem; whatever already arrived still counts.
    if let Err(e) = session.stop().await {
        warn!(error = %e, "Failed to stop recognition session");
    }

    let mut transcript = Transcript::new();
    let ended_by = loop {
        match rx.recv().await {
            Some(SessionEvent::SentenceEnd(text)) => {
                debug!(%text, "Sentence ended");
                transcript.push_segment(text);
            },
            Some(SessionEvent::SentenceBegin(info)) => debug!(%info, "Sentence began"),
            Some(SessionEvent::ResultChanged(partial)) => debug!(%partial, "Result changed"),
            Some(event) if event.is_terminal() => break event,
            Some(event) => debug!(?event, "Ignoring recognition event"),
            None => break SessionEvent::Closed,
        }
    };

    log_end("recognition", &ended_by);
    Ok(SessionOutcome {
        output: transcript,
        ended_by,
    })
}

fn log_end(kind: &str, ended_by: &SessionEvent) {
    match ended_by {
        SessionEvent::Completed(message) => debug!(kind, %message, "Session completed"),
        SessionEvent::Error(detail) => warn!(kind, %detail, "Provider reported an error"),
        _ => debug!(kind, "Session closed"),
    }
}

fn describe_end(ended_by: &SessionEvent) -> String {
    match ended_by {
        SessionEvent::Completed(_) => "session completed without output".to_string(),
        SessionEvent::Error(detail) => format!("session failed: {detail}"),
        _ => "connection closed without output".to_string(),
    }
}
