//! Application configuration
//!
//! Values are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. `config.toml` (or any format the `config` crate understands) in the
//!    working directory, if present
//! 3. `SPEECH_GATEWAY_*` environment variables, with `__` between nested keys
//!    (e.g. `SPEECH_GATEWAY_SERVER__PORT=9000`,
//!    `SPEECH_GATEWAY_SPEECH__SESSION_TIMEOUT_MS=30000`)
//! 4. the plain `TOKEN` and `APPKEY` variables for the gateway credentials

mod server;

use ai_speech::SpeechConfig;
use serde::{Deserialize, Serialize};

pub use server::ServerConfig;

use crate::telemetry::TelemetryConfig;

/// Prefix for structured environment overrides
pub const ENV_PREFIX: &str = "SPEECH_GATEWAY";

/// Environment variable holding the gateway access token
pub const TOKEN_VAR: &str = "TOKEN";

/// Environment variable holding the gateway application key
pub const APPKEY_VAR: &str = "APPKEY";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Speech gateway and session configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment and optional file
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_sources(
            config::File::with_name("config").required(false),
            std::env::vars().collect(),
        )
    }

    fn from_sources<F>(
        file: F,
        vars: config::Map<String, String>,
    ) -> Result<Self, config::ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let token = vars.get(TOKEN_VAR).cloned();
        let appkey = vars.get(APPKEY_VAR).cloned();

        let builder = config::Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            // Load from file if exists
            .add_source(file)
            // Override with environment variables (e.g., SPEECH_GATEWAY_SERVER__PORT)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .source(Some(vars)),
            )
            .set_override_option("speech.token", token)?
            .set_override_option("speech.appkey", appkey)?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first problem found, prefixed with its section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate().map_err(|e| format!("server: {e}"))?;
        self.speech.validate().map_err(|e| format!("speech: {e}"))?;
        Ok(())
    }
}
