// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{create_app, AppState, PredictionService, ServiceStatistics};
pub use config::{AppConfig, PipelineConfig, ServiceConfig};
pub use pipeline::{FrameResult, FrameSuccess, InferencePipeline, PredictionRecord};
pub use vision::{BoundingBox, ImageInput, RecognitionResult, VisionModelManager};
