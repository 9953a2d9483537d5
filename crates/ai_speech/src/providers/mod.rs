//! Speech provider implementations
//!
//! Contains concrete implementations of the session ports.

pub mod nls;

pub use nls::NlsSpeechProvider;
