// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pipeline configuration sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;

/// Detector thresholds and model location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum detector confidence (0.0-1.0)
    pub confidence_min: f32,
    /// IoU above which overlapping boxes are suppressed (0.0-1.0)
    pub overlap_max: f32,
    /// Explicit path to a trained ONNX detector
    pub model_path: Option<PathBuf>,
    /// Default architecture loaded from `models_dir` when `model_path` is unusable
    pub architecture: String,
    /// Directory holding `<architecture>.onnx`
    pub models_dir: PathBuf,
    /// Newline-separated class labels, index = class id
    pub class_names_path: Option<PathBuf>,
    /// Square network input size
    pub input_size: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_min: 0.3,
            overlap_max: 0.45,
            model_path: None,
            architecture: "yolov8n".to_string(),
            models_dir: PathBuf::from("./models"),
            class_names_path: None,
            input_size: 640,
        }
    }
}

impl DetectionConfig {
    /// Path of the default-architecture model
    pub fn default_model_path(&self) -> PathBuf {
        self.models_dir.join(format!("{}.onnx", self.architecture))
    }
}

/// Geometric acceptance policy and crop padding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoiConfig {
    pub padding_ratio: f32,
    pub min_area: i64,
    pub max_aspect_ratio: f32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            padding_ratio: 0.1,
            min_area: 100,
            max_aspect_ratio: 5.0,
        }
    }
}

/// Binarization policy applied as the last enhancement step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// Gaussian-weighted local threshold
    #[default]
    Adaptive,
    /// Global Otsu threshold
    Otsu,
    /// Leave the intensity image as is
    None,
}

/// Legibility enhancement toggles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnhanceConfig {
    pub denoise: bool,
    pub contrast_enhancement: bool,
    pub brightness_adjustment: bool,
    pub min_height: u32,
    pub threshold_method: ThresholdMethod,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            denoise: true,
            contrast_enhancement: true,
            brightness_adjustment: true,
            min_height: 32,
            threshold_method: ThresholdMethod::Adaptive,
        }
    }
}

/// Text engine invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Engine executable
    pub binary: String,
    /// Language pack
    pub language: String,
    /// Page segmentation mode (6 = single uniform block of text)
    pub page_segmentation_mode: u32,
    /// OCR engine mode (3 = default available engine)
    pub engine_mode: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: 6,
            engine_mode: 3,
        }
    }
}

/// Text normalization policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub remove_special_chars: bool,
    /// Canonical labels, first match wins
    pub known_patterns: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            remove_special_chars: true,
            known_patterns: vec!["STOP".to_string(), "YIELD".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerformanceConfig {
    pub enable_cache: bool,
    /// Maximum number of cached frame results
    pub cache_capacity: usize,
    /// Blocking workers for detection/recognition, 0 = available parallelism
    pub max_workers: usize,
    /// Processing time (seconds) a prediction should stay under
    pub performance_target_secs: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_capacity: 256,
            max_workers: 0,
            performance_target_secs: 2.0,
        }
    }
}

impl PerformanceConfig {
    /// Number of workers after resolving the `0 = auto` setting
    pub fn resolved_workers(&self) -> usize {
        if self.max_workers > 0 {
            return self.max_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Experiment tracking side channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    /// JSON-lines file receiving one record per prediction
    pub output_path: Option<PathBuf>,
    pub queue_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_path: None,
            queue_capacity: 1024,
        }
    }
}

/// All settings consumed by the inference pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection: DetectionConfig,
    pub roi: RoiConfig,
    pub enhance: EnhanceConfig,
    pub recognition: RecognitionConfig,
    pub text: TextConfig,
    pub performance: PerformanceConfig,
    pub tracking: TrackingConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.detection.confidence_min) {
            return Err(ConfigError::invalid(
                "detection.confidence_min",
                format!("{} is outside [0, 1]", self.detection.confidence_min),
            ));
        }
        if !unit.contains(&self.detection.overlap_max) {
            return Err(ConfigError::invalid(
                "detection.overlap_max",
                format!("{} is outside [0, 1]", self.detection.overlap_max),
            ));
        }
        if self.detection.input_size == 0 || self.detection.input_size % 32 != 0 {
            return Err(ConfigError::invalid(
                "detection.input_size",
                "must be a positive multiple of 32",
            ));
        }
        if !(self.roi.padding_ratio >= 0.0) {
            return Err(ConfigError::invalid(
                "roi.padding_ratio",
                "must be zero or positive",
            ));
        }
        if !(self.roi.max_aspect_ratio > 0.0) {
            return Err(ConfigError::invalid(
                "roi.max_aspect_ratio",
                "must be positive",
            ));
        }
        if self.enhance.min_height == 0 {
            return Err(ConfigError::invalid(
                "enhance.min_height",
                "must be at least 1",
            ));
        }
        if self.performance.enable_cache && self.performance.cache_capacity == 0 {
            return Err(ConfigError::invalid(
                "performance.cache_capacity",
                "must be at least 1 when caching is enabled",
            ));
        }
        if self.tracking.enabled && self.tracking.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "tracking.queue_capacity",
                "must be at least 1 when tracking is enabled",
            ));
        }
        Ok(())
    }
}
