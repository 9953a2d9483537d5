//! Speech gateway HTTP server
//!
//! Main entry point for the HTTP API server.

use std::{future::IntoFuture, sync::Arc, time::Duration};

use ai_speech::{NlsSpeechProvider, SessionOrchestrator};
use anyhow::Context;
use infrastructure::{AppConfig, init_telemetry};
use presentation_http::{routes, state::AppState};
use tokio::{net::TcpListener, signal, sync::oneshot};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_telemetry(&config.telemetry)?;

    info!("🎙️ Speech gateway v{} starting...", env!("CARGO_PKG_VERSION"));

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    info!(
        host = %config.server.host,
        port = %config.server.port,
        endpoint = %config.speech.endpoint,
        voice = %config.speech.voice,
        sample_rate = config.speech.sample_rate,
        tail_policy = ?config.speech.tail_policy,
        session_timeout_ms = config.speech.session_timeout_ms,
        "Configuration loaded"
    );

    let provider = NlsSpeechProvider::new(config.speech.clone())
        .context("Failed to initialize speech provider")?;
    let orchestrator = SessionOrchestrator::new(Arc::new(provider), config.speech.clone())
        .context("Failed to initialize session orchestrator")?;

    let addr = config.server.bind_addr();
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs.unwrap_or(30));

    let app = routes::create_router(AppState::new(orchestrator, config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🚀 Server listening on http://{}", addr);

    let (draining_tx, draining_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = draining_tx.send(());
        })
        .into_future();

    let deadline = async move {
        if draining_rx.await.is_ok() {
            info!("⏳ Waiting up to {:?} for connections to close...", shutdown_timeout);
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => result?,
        () = deadline => warn!("Connections still open after shutdown timeout, exiting"),
    }

    info!("👋 Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("📥 Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("📥 Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
