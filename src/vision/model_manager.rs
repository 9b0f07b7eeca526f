// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Loads the sign detector and probes the text engine at startup
//!
//! A missing model or engine never aborts startup: the failure is logged and
//! reported through `has_detector()` / `has_text_engine()`, which drive the
//! degraded health status.

use std::path::PathBuf;
use std::sync::Arc;

use super::detection::{load_class_names, ObjectDetector, YoloDetector};
use super::recognition::{TesseractEngine, TextEngine};
use crate::config::{DetectionConfig, PipelineConfig};

/// Information about a loaded vision model
#[derive(Debug, Clone, PartialEq)]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model type (detection, ocr)
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Owner of the detector and text engine handles shared by the pipeline
#[derive(Clone)]
pub struct VisionModelManager {
    detector: Option<Arc<dyn ObjectDetector>>,
    text_engine: Arc<dyn TextEngine>,
    text_engine_available: bool,
}

impl std::fmt::Debug for VisionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionModelManager")
            .field("detector", &self.detector.as_ref().map(|d| d.name().to_string()))
            .field("text_engine_available", &self.text_engine_available)
            .finish()
    }
}

impl VisionModelManager {
    /// Load the detector and probe the Tesseract engine described by `config`
    pub fn load(config: &PipelineConfig) -> Self {
        let detector = load_detector(&config.detection);

        let engine = TesseractEngine::new(config.recognition.clone());
        let text_engine_available = match engine.probe() {
            Ok(version) => {
                tracing::info!("✅ Text engine available: {}", version);
                true
            }
            Err(e) => {
                tracing::warn!("⚠️ Text engine unavailable: {}", e);
                false
            }
        };

        Self {
            detector,
            text_engine: Arc::new(engine),
            text_engine_available,
        }
    }

    /// Assemble from already constructed parts
    pub fn from_parts(
        detector: Option<Arc<dyn ObjectDetector>>,
        text_engine: Arc<dyn TextEngine>,
        text_engine_available: bool,
    ) -> Self {
        Self {
            detector,
            text_engine,
            text_engine_available,
        }
    }

    /// Get the detector if available
    pub fn detector(&self) -> Option<Arc<dyn ObjectDetector>> {
        self.detector.clone()
    }

    pub fn text_engine(&self) -> Arc<dyn TextEngine> {
        self.text_engine.clone()
    }

    /// Check if a detector is loaded
    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// Check if the text engine answered its probe
    pub fn has_text_engine(&self) -> bool {
        self.text_engine_available
    }

    /// List all vision models and their availability
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: self
                    .detector
                    .as_ref()
                    .map(|d| d.name().to_string())
                    .unwrap_or_else(|| "detector".to_string()),
                model_type: "detection".to_string(),
                available: self.detector.is_some(),
            },
            VisionModelInfo {
                name: "tesseract".to_string(),
                model_type: "ocr".to_string(),
                available: self.text_engine_available,
            },
        ]
    }
}

/// Pick the explicit model path when it exists, else the default architecture
pub fn resolve_model_path(config: &DetectionConfig) -> Option<PathBuf> {
    if let Some(ref path) = config.model_path {
        if path.exists() {
            return Some(path.clone());
        }
        tracing::warn!(
            "⚠️ Model path {} not found, falling back to {}",
            path.display(),
            config.architecture
        );
    }

    let default = config.default_model_path();
    if default.exists() {
        Some(default)
    } else {
        tracing::warn!("⚠️ Default detection model {} not found", default.display());
        None
    }
}

fn load_detector(config: &DetectionConfig) -> Option<Arc<dyn ObjectDetector>> {
    let path = resolve_model_path(config)?;

    let class_names = match config.class_names_path {
        Some(ref labels) => match load_class_names(labels) {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("⚠️ {:#}, using numeric class names", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    match YoloDetector::load(&path, config.input_size, class_names) {
        Ok(detector) => Some(Arc::new(detector)),
        Err(e) => {
            tracing::warn!(
                "⚠️ Failed to load detection model from {}: {:#}",
                path.display(),
                e
            );
            None
        }
    }
}
