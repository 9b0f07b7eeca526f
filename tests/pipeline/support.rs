// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic detector and text engine stand-ins

use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use roadsign_node::config::PipelineConfig;
use roadsign_node::pipeline::{InferencePipeline, NoopTracker};
use roadsign_node::vision::{
    BoundingBox, DetectionCandidate, DetectionError, EngineError, ObjectDetector, TextEngine,
    VisionModelManager, WordToken,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Returns the same candidates for every frame
pub struct FixedDetector {
    pub candidates: Vec<DetectionCandidate>,
    pub calls: AtomicUsize,
}

impl FixedDetector {
    pub fn new(candidates: Vec<DetectionCandidate>) -> Self {
        Self {
            candidates,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ObjectDetector for FixedDetector {
    fn detect(
        &self,
        _image: &RgbImage,
        confidence_min: f32,
        _overlap_max: f32,
    ) -> Result<Vec<DetectionCandidate>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .candidates
            .iter()
            .filter(|c| c.confidence >= confidence_min)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Reads the same words from every crop
pub struct FixedEngine {
    pub words: Vec<WordToken>,
}

impl TextEngine for FixedEngine {
    fn recognize_words(&self, _image: &GrayImage) -> Result<Vec<WordToken>, EngineError> {
        Ok(self.words.clone())
    }

    fn probe(&self) -> Result<String, EngineError> {
        Ok("fixed 1.0".to_string())
    }
}

pub fn candidate(bbox: [i64; 4], confidence: f32) -> DetectionCandidate {
    DetectionCandidate {
        bbox: BoundingBox::from(bbox),
        confidence,
        class_id: 11,
        class_name: "stop sign".to_string(),
    }
}

pub fn stop_engine() -> Arc<FixedEngine> {
    Arc::new(FixedEngine {
        words: vec![WordToken::new("stop", 90.0), WordToken::new("sign", 70.0)],
    })
}

/// 640x480 grey frame encoded as PNG
pub fn frame_png() -> Vec<u8> {
    let image = RgbImage::from_pixel(640, 480, Rgb([128, 128, 128]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn build_pipeline(
    detector: Option<Arc<dyn ObjectDetector>>,
    engine: Arc<dyn TextEngine>,
    config: PipelineConfig,
) -> InferencePipeline {
    let models = VisionModelManager::from_parts(detector, engine, true);
    InferencePipeline::new(config, &models, Arc::new(NoopTracker))
}

/// Config with caching off so every call reaches the detector
pub fn uncached_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.performance.enable_cache = false;
    config.tracking.enabled = false;
    config
}
