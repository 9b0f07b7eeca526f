// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    http::Uri,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::errors::ApiError;
use super::predict::{predict_batch_handler, predict_handler};
use super::service::PredictionService;
use crate::config::ServiceConfig;

/// Extra room for multipart framing on top of the image payloads
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    /// Per-image upload cap
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, config: &ServiceConfig) -> Self {
        Self {
            service,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    fn body_limit(&self) -> usize {
        self.max_upload_bytes
            .saturating_mul(self.service.max_batch_size())
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        // Predictions
        .route("/predict", post(predict_handler))
        .route("/predict/batch", post(predict_batch_handler))
        // Health check
        .route("/health", get(health_handler))
        // Metrics endpoint
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn start_server(
    config: &ServiceConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_app(state);

    let addr = config.listen_addr.parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("🚀 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.health().await)
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.metrics().await)
}

async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
