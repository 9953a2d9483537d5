//! Configuration for speech sessions

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::types::PcmSpec;
use crate::uploader::{TailPolicy, UploadConfig};

/// Default streaming gateway endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://nls-gateway-cn-shanghai.aliyuncs.com/ws/v1";

/// Configuration for the speech provider and session orchestration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// WebSocket endpoint of the speech gateway
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Pre-provisioned access token
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,

    /// Application key issued by the speech service
    #[serde(default)]
    pub appkey: Option<String>,

    /// Voice used for synthesis
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Sample rate of synthesized and uploaded PCM
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Channel count of synthesized and uploaded PCM
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Bytes per sample (2 = signed 16-bit)
    #[serde(default = "default_bytes_per_sample")]
    pub bytes_per_sample: u16,

    /// Synthesis volume (0-100)
    #[serde(default = "default_volume")]
    pub volume: u8,

    /// Synthesis speech rate (-500 to 500)
    #[serde(default)]
    pub speech_rate: i16,

    /// Synthesis pitch rate (-500 to 500)
    #[serde(default)]
    pub pitch_rate: i16,

    /// Bytes per uploaded audio frame
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,

    /// Delay between uploaded frames in milliseconds
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// What to do with a trailing partial frame
    #[serde(default)]
    pub tail_policy: TailPolicy,

    /// Ask the recognizer for intermediate results
    #[serde(default = "default_true")]
    pub enable_intermediate_result: bool,

    /// Ask the recognizer to insert punctuation
    #[serde(default = "default_true")]
    pub enable_punctuation_prediction: bool,

    /// Ask the recognizer to normalize numbers and dates
    #[serde(default)]
    pub enable_inverse_text_normalization: bool,

    /// Upper bound for a whole session in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Upper bound for the provider's start handshake in milliseconds
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_voice() -> String {
    "ailun".to_string()
}

const fn default_sample_rate() -> u32 {
    16_000
}

const fn default_channels() -> u16 {
    1
}

const fn default_bytes_per_sample() -> u16 {
    2
}

const fn default_volume() -> u8 {
    50
}

const fn default_frame_size() -> usize {
    640 // 20ms of 16kHz mono s16le
}

const fn default_frame_interval_ms() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

const fn default_session_timeout_ms() -> u64 {
    60_000
}

const fn default_start_timeout_ms() -> u64 {
    10_000
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            appkey: None,
            voice: default_voice(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bytes_per_sample: default_bytes_per_sample(),
            volume: default_volume(),
            speech_rate: 0,
            pitch_rate: 0,
            frame_size: default_frame_size(),
            frame_interval_ms: default_frame_interval_ms(),
            tail_policy: TailPolicy::default(),
            enable_intermediate_result: true,
            enable_punctuation_prediction: true,
            enable_inverse_text_normalization: false,
            session_timeout_ms: default_session_timeout_ms(),
            start_timeout_ms: default_start_timeout_ms(),
        }
    }
}

impl SpeechConfig {
    /// Create a minimal config for testing
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            token: Some(SecretString::from("test-token")),
            appkey: Some("test-appkey".to_string()),
            frame_interval_ms: 0,
            session_timeout_ms: 2_000,
            ..Default::default()
        }
    }

    /// PCM layout shared by synthesis output and recognition input
    #[must_use]
    pub const fn pcm_spec(&self) -> PcmSpec {
        PcmSpec::new(self.sample_rate, self.channels, self.bytes_per_sample)
    }

    /// Chunked upload settings
    #[must_use]
    pub const fn upload(&self) -> UploadConfig {
        UploadConfig {
            frame_size: self.frame_size,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            tail_policy: self.tail_policy,
        }
    }

    #[must_use]
    pub const fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Expose the token for the connection handshake
    pub(crate) fn token(&self) -> &str {
        self.token
            .as_ref()
            .map_or("", |token| token.expose_secret())
    }

    pub(crate) fn appkey(&self) -> &str {
        self.appkey.as_deref().unwrap_or_default()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self
            .token
            .as_ref()
            .is_none_or(|token| token.expose_secret().trim().is_empty())
        {
            return Err("Access token is required".to_string());
        }

        if self.appkey.as_deref().is_none_or(|key| key.trim().is_empty()) {
            return Err("Application key is required".to_string());
        }

        if !self.endpoint.starts_with("ws://") && !self.endpoint.starts_with("wss://") {
            return Err(format!(
                "Endpoint must be a ws:// or wss:// URL, got {}",
                self.endpoint
            ));
        }

        if self.sample_rate == 0 {
            return Err("Sample rate must be greater than 0".to_string());
        }

        if self.channels == 0 || self.bytes_per_sample == 0 {
            return Err("Channels and bytes per sample must be greater than 0".to_string());
        }

        if self.frame_size == 0 {
            return Err("Frame size must be greater than 0".to_string());
        }

        if self.volume > 100 {
            return Err(format!("Volume must be between 0 and 100, got {}", self.volume));
        }

        if self.session_timeout_ms == 0 || self.start_timeout_ms == 0 {
            return Err("Timeouts must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SpeechConfig::default();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.token.is_none());
        assert!(config.appkey.is_none());
        assert_eq!(config.voice, "ailun");
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.bytes_per_sample, 2);
        assert_eq!(config.frame_size, 640);
        assert_eq!(config.frame_interval_ms, 10);
        assert_eq!(config.tail_policy, TailPolicy::Drop);
        assert!(config.enable_intermediate_result);
        assert!(config.enable_punctuation_prediction);
        assert_eq!(config.session_timeout_ms, 60000);
    }

    #[test]
    fn validate_fails_without_token() {
        let config = SpeechConfig {
            appkey: Some("key".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            "Access token is required"
        );
    }

    #[test]
    fn validate_fails_without_appkey() {
        let config = SpeechConfig {
            token: Some(SecretString::from("token")),
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            "Application key is required"
        );
    }

    #[test]
    fn validate_succeeds_with_credentials() {
        assert!(SpeechConfig::test().validate().is_ok());
    }

    #[test]
    fn validate_rejects_http_endpoint() {
        let mut config = SpeechConfig::test();
        config.endpoint = "https://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_frame_size() {
        let mut config = SpeechConfig::test();
        config.frame_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut config = SpeechConfig::test();
        config.session_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SpeechConfig::test();
        config.start_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_loud_volume() {
        let mut config = SpeechConfig::test();
        config.volume = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn pcm_spec_follows_config() {
        let config = SpeechConfig {
            sample_rate: 8000,
            channels: 2,
            ..Default::default()
        };
        let spec = config.pcm_spec();
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bytes_per_sample, 2);
    }

    #[test]
    fn upload_settings_follow_config() {
        let config = SpeechConfig::default();
        let upload = config.upload();
        assert_eq!(upload.frame_size, 640);
        assert_eq!(upload.frame_interval, Duration::from_millis(10));
        assert_eq!(upload.tail_policy, TailPolicy::Drop);
    }

    #[test]
    fn token_is_not_serialized() {
        let json = serde_json::to_string(&SpeechConfig::test()).unwrap();
        assert!(!json.contains("test-token"));
        assert!(json.contains("test-appkey"));
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml = r#"
            endpoint = "ws://127.0.0.1:9000/ws/v1"
            token = "abc"
            appkey = "my-app"
            voice = "xiaoyun"
            sample_rate = 8000
            frame_size = 320
            frame_interval_ms = 20
            tail_policy = "pad"
            session_timeout_ms = 15000
        "#;

        let config: SpeechConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.endpoint, "ws://127.0.0.1:9000/ws/v1");
        assert_eq!(config.token(), "abc");
        assert_eq!(config.appkey(), "my-app");
        assert_eq!(config.voice, "xiaoyun");
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.frame_size, 320);
        assert_eq!(config.frame_interval_ms, 20);
        assert_eq!(config.tail_policy, TailPolicy::Pad);
        assert_eq!(config.session_timeout_ms, 15000);
        assert!(config.validate().is_ok());
    }
}
