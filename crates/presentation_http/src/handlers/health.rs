//! Health check handler

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Name of the configured speech provider
    pub provider: String,
}

/// Liveness check - is the server running?
///
/// Does not contact the speech provider.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.orchestrator.provider_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serialization() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.2.0".to_string(),
            provider: "nls".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"], "nls");
    }
}
