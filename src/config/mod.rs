// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Typed configuration for the prediction service
//!
//! Configuration is resolved once at startup, in this order:
//! 1. Built-in defaults (every field has one)
//! 2. Optional TOML file
//! 3. `ROADSIGN_*` environment variables
//! 4. Command line flags (applied by the binary)
//!
//! The validated result is shared by reference and never re-read per request.

pub mod pipeline;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use pipeline::{
    DetectionConfig, EnhanceConfig, PerformanceConfig, PipelineConfig, RecognitionConfig,
    RoiConfig, TextConfig, ThresholdMethod, TrackingConfig,
};

/// Maximum upload size (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// HTTP-facing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds to
    pub listen_addr: String,
    /// Maximum number of images accepted by one batch request
    pub max_batch_size: usize,
    /// Maximum accepted size of a single uploaded image, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            max_batch_size: 10,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `ROADSIGN_*` environment variable overrides
    ///
    /// Unparseable values are ignored and the previous value is kept.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("ROADSIGN_LISTEN_ADDR") {
            self.service.listen_addr = val;
        }

        if let Ok(val) = std::env::var("ROADSIGN_MAX_BATCH_SIZE") {
            if let Ok(num) = val.parse() {
                self.service.max_batch_size = num;
            }
        }

        if let Ok(val) = std::env::var("ROADSIGN_MODEL_PATH") {
            self.pipeline.detection.model_path = Some(val.into());
        }

        if let Ok(val) = std::env::var("ROADSIGN_MODELS_DIR") {
            self.pipeline.detection.models_dir = val.into();
        }

        if let Ok(val) = std::env::var("ROADSIGN_CONFIDENCE_MIN") {
            if let Ok(num) = val.parse() {
                self.pipeline.detection.confidence_min = num;
            }
        }

        if let Ok(val) = std::env::var("ROADSIGN_ENABLE_CACHE") {
            self.pipeline.performance.enable_cache = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("ROADSIGN_TRACKING_PATH") {
            self.pipeline.tracking.output_path = Some(val.into());
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.max_batch_size == 0 {
            return Err(ConfigError::invalid(
                "service.max_batch_size",
                "must be at least 1",
            ));
        }
        if self.service.max_upload_bytes == 0 {
            return Err(ConfigError::invalid(
                "service.max_upload_bytes",
                "must be at least 1",
            ));
        }
        self.pipeline.validate()
    }
}
