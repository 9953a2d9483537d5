//! Application state shared across handlers

use std::sync::Arc;

use ai_speech::SessionOrchestrator;
use infrastructure::AppConfig;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Runs synthesis and recognition sessions
    pub orchestrator: Arc<SessionOrchestrator>,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: SessionOrchestrator, config: AppConfig) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
        }
    }
}
