//! Logging setup
//!
//! Installs a `tracing` subscriber with an env-driven filter and either
//! human-readable or JSON output.

mod logging;

pub use logging::{LogFormat, TelemetryConfig, TelemetryError, init_telemetry};
