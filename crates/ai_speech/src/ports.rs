//! Port definitions for speech sessions
//!
//! A speech provider is a remote, callback-driven service. Adapters open
//! sessions and report everything the service says through a [`SessionEvent`]
//! channel, which takes the place of callback registration.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::SpeechError;
use crate::types::PcmSpec;

/// Channel on which a session reports its events
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Receiving half of a session's event channel
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create a fresh event channel for one session
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Everything a provider can tell us about a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The provider accepted the start request
    Started,
    /// Synthesis metadata (timestamps, phonemes)
    MetaInfo(String),
    /// A chunk of synthesized PCM
    AudioData(Bytes),
    /// The recognizer detected the start of a sentence
    SentenceBegin(String),
    /// Intermediate hypothesis for the current sentence
    ResultChanged(String),
    /// Final text for one sentence
    SentenceEnd(String),
    /// The provider finished the task
    Completed(String),
    /// The provider reported a task failure
    Error(String),
    /// The connection went away
    Closed,
}

impl SessionEvent {
    /// Completion, failure and disconnect all end a session
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Error(_) | Self::Closed)
    }
}

/// Parameters for a synthesis session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisParams {
    pub text: String,
    pub voice: String,
    pub spec: PcmSpec,
    pub volume: u8,
    pub speech_rate: i16,
    pub pitch_rate: i16,
}

/// Parameters for a recognition session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionParams {
    pub spec: PcmSpec,
    pub enable_intermediate_result: bool,
    pub enable_punctuation_prediction: bool,
    pub enable_inverse_text_normalization: bool,
}

/// Port for a text-to-speech session
#[async_trait]
pub trait SynthesisSession: Send {
    /// Start synthesis
    ///
    /// Audio, completion and failure are delivered on `events`; the session
    /// keeps producing after this call returns.
    async fn start(
        &mut self,
        params: &SynthesisParams,
        events: EventSender,
    ) -> Result<(), SpeechError>;
}

/// Port for a speech-to-text session
#[async_trait]
pub trait RecognitionSession: Send {
    /// Start recognition; returns once the provider is ready for audio
    async fn start(
        &mut self,
        params: &RecognitionParams,
        events: EventSender,
    ) -> Result<(), SpeechError>;

    /// Send one frame of PCM
    async fn send_audio(&mut self, frame: Bytes) -> Result<(), SpeechError>;

    /// Tell the provider no more audio follows
    async fn stop(&mut self) -> Result<(), SpeechError>;
}

/// Port for an external speech provider
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Open a new, unstarted synthesis session
    async fn synthesis_session(&self) -> Result<Box<dyn SynthesisSession>, SpeechError>;

    /// Open a new, unstarted recognition session
    async fn recognition_session(&self) -> Result<Box<dyn RecognitionSession>, SpeechError>;

    /// Short provider identifier for logs and health output
    fn name(&self) -> &str;
}
