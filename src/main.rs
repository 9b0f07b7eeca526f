// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use roadsign_node::{
    api::{start_server, AppState, PredictionService, ServiceStatistics},
    cli::Cli,
    pipeline::{ChannelTracker, ExperimentTracker, InferencePipeline, NoopTracker},
    version,
    vision::VisionModelManager,
};
use std::{env, sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    info!("🚀 Starting {}", version::get_version_string());
    info!("📅 Build Date: {}", version::BUILD_DATE);

    let config = cli.load_config().context("Invalid configuration")?;
    info!("Listening address: {}", config.service.listen_addr);

    // Loading the ONNX session and probing tesseract both block
    let pipeline_config = config.pipeline.clone();
    let models = tokio::task::spawn_blocking(move || VisionModelManager::load(&pipeline_config))
        .await
        .context("Model loading task failed")?;

    for model in models.list_models() {
        info!(
            "Model {} ({}) available: {}",
            model.name, model.model_type, model.available
        );
    }

    let (tracker, tracker_task): (Arc<dyn ExperimentTracker>, _) =
        if config.pipeline.tracking.enabled {
            let (tracker, handle) = ChannelTracker::spawn(&config.pipeline.tracking);
            (Arc::new(tracker), Some(handle))
        } else {
            (Arc::new(NoopTracker), None)
        };

    let pipeline = Arc::new(
        InferencePipeline::new(config.pipeline.clone(), &models, tracker)
            .with_max_image_bytes(config.service.max_upload_bytes),
    );
    let service = Arc::new(PredictionService::new(
        pipeline,
        ServiceStatistics::new(),
        &config.service,
        models.has_text_engine(),
    ));

    if !service.is_loaded() {
        warn!("⚠️ No detection model loaded, /predict will answer 503 until restarted with a model");
    }

    let state = AppState::new(service, &config.service);
    start_server(&config.service, state)
        .await
        .map_err(|e| anyhow!("API server failed: {}", e))?;

    // Every tracker handle is gone with the server state; let the writer flush
    if let Some(handle) = tracker_task {
        if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
            warn!("Tracking writer did not finish in time");
        }
    }

    info!("Node stopped");
    Ok(())
}
