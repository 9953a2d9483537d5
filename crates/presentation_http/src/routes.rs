//! Route definitions

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use infrastructure::ServerConfig;
use tower::ServiceBuilder;
use tower_http::{
    compression::{
        CompressionLayer, CompressionLevel,
        predicate::{DefaultPredicate, Predicate, SizeAbove},
    },
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{handlers, middleware::propagate_request_id, state::AppState};

/// Create the main router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(propagate_request_id))
        .layer(cors_layer(server))
        .layer(compression_layer(server))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/synthesize", post(handlers::speech::synthesize))
        .route("/recognize", post(handlers::speech::recognize))
        .layer(layers)
        .with_state(state)
}

/// Open CORS unless specific origins are configured
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            },
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// gzip for responses above the configured size
fn compression_layer(server: &ServerConfig) -> CompressionLayer<impl Predicate + use<>> {
    let predicate = DefaultPredicate::new().and(SizeAbove::new(server.compression_min_bytes));

    CompressionLayer::new()
        .gzip(true)
        .quality(CompressionLevel::Precise(i32::from(server.compression_level)))
        .compress_when(predicate)
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn compression_layer_outlives_server_config() {
        let layer = {
            let server = ServerConfig {
                compression_min_bytes: 10,
                ..ServerConfig::default()
            };
            compression_layer(&server)
        };
        let app: Router = Router::new()
            .route("/", get(|| async { "a".repeat(64) }))
            .layer(layer);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("accept-encoding", "gzip")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["content-encoding"], "gzip");
    }
}
