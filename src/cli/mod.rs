// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Command line flags for the node binary

use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, ConfigError};

/// Road sign detection and recognition service
#[derive(Parser, Debug, Default)]
#[command(name = "roadsign-node")]
#[command(version)]
#[command(about = "Road sign detection and text recognition over HTTP", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "ROADSIGN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g. 0.0.0.0:8000)
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Trained detection model (ONNX)
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Directory holding default architecture models
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long)]
    pub confidence_min: Option<f32>,

    /// Disable the prediction cache
    #[arg(long)]
    pub no_cache: bool,

    /// Append per-prediction metrics to this JSON-lines file
    #[arg(long)]
    pub tracking_path: Option<PathBuf>,
}

impl Cli {
    /// Override configuration values with the flags that were given
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(ref addr) = self.listen_addr {
            config.service.listen_addr = addr.clone();
        }
        if let Some(ref path) = self.model_path {
            config.pipeline.detection.model_path = Some(path.clone());
        }
        if let Some(ref dir) = self.models_dir {
            config.pipeline.detection.models_dir = dir.clone();
        }
        if let Some(confidence) = self.confidence_min {
            config.pipeline.detection.confidence_min = confidence;
        }
        if self.no_cache {
            config.pipeline.performance.enable_cache = false;
        }
        if let Some(ref path) = self.tracking_path {
            config.pipeline.tracking.output_path = Some(path.clone());
        }
    }

    /// File, then environment, then flags, then validation
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match self.config {
            Some(ref path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        config.apply_env();
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}
