//! Infrastructure layer - configuration and logging
//!
//! Loads [`AppConfig`] from defaults, an optional config file and the
//! environment, and installs the tracing subscriber.

pub mod config;
pub mod telemetry;

pub use config::{AppConfig, ServerConfig};
pub use telemetry::{LogFormat, TelemetryConfig, TelemetryError, init_telemetry};
