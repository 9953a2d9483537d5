//! HTTP server configuration.

use serde::{Deserialize, Serialize};

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins (empty = allow all)
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Graceful shutdown timeout in seconds
    #[serde(default)]
    pub shutdown_timeout_secs: Option<u64>,

    /// Maximum body size for audio uploads in bytes (default: 10MB)
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,

    /// Responses smaller than this are sent uncompressed
    #[serde(default = "default_compression_min")]
    pub compression_min_bytes: u16,

    /// gzip level (1-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u8,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_upload() -> usize {
    10 * 1024 * 1024 // 10MB
}

const fn default_compression_min() -> u16 {
    1000
}

const fn default_compression_level() -> u8 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
            shutdown_timeout_secs: Some(30),
            max_upload_bytes: default_max_upload(),
            compression_min_bytes: default_compression_min(),
            compression_level: default_compression_level(),
        }
    }
}

impl ServerConfig {
    /// Socket address string to bind
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Server host must not be empty".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("Maximum upload size must be greater than 0".to_string());
        }

        if !(1..=9).contains(&self.compression_level) {
            return Err(format!(
                "Compression level must be between 1 and 9, got {}",
                self.compression_level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.compression_min_bytes, 1000);
        assert_eq!(config.compression_level, 5);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn validate_rejects_bad_compression_level() {
        let config = ServerConfig {
            compression_level: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            compression_level: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_upload_limit() {
        let config = ServerConfig {
            max_upload_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_partial_toml() {
        let config: ServerConfig = toml::from_str("port = 9000\nallowed_origins = [\"https://app.example.com\"]").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.allowed_origins, vec!["https://app.example.com".to_string()]);
    }
}
