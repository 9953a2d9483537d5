//! AI Speech - speech sessions against a streaming speech gateway
//!
//! Provides the pieces the HTTP gateway needs to turn a callback-driven
//! speech service into plain request/response calls:
//! - [`SessionOrchestrator`] - run one synthesis or recognition session and
//!   wait for its result with a timeout
//! - [`wav`] - wrap headerless PCM in a RIFF/WAVE container
//! - [`uploader`] - feed captured PCM to a recognizer in paced frames
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the session traits and the event channel
//! - `providers` module contains concrete implementations (adapters)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ai_speech::{NlsSpeechProvider, SessionOrchestrator, SpeechConfig};
//!
//! let provider = Arc::new(NlsSpeechProvider::new(config.clone())?);
//! let orchestrator = SessionOrchestrator::new(provider, config)?;
//!
//! let wav = orchestrator.synthesize("你好").await?;
//! let transcript = orchestrator.recognize(pcm).await?;
//! println!("Recognized: {}", transcript.text());
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod providers;
pub mod types;
pub mod uploader;
pub mod wav;

pub use config::SpeechConfig;
pub use error::SpeechError;
pub use orchestrator::SessionOrchestrator;
pub use ports::{
    EventSender, RecognitionParams, RecognitionSession, SessionEvent, SpeechProvider,
    SynthesisParams, SynthesisSession,
};
pub use providers::NlsSpeechProvider;
pub use types::{AudioData, AudioFormat, PcmSpec, Transcript};
pub use uploader::{FrameSink, TailPolicy, UploadConfig, UploadReport};
pub use wav::{WAV_HEADER_LEN, WavHeader};
