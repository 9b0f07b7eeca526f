// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fire-and-forget experiment tracking
//!
//! `record()` never blocks and never fails the caller. Records go through a
//! bounded queue to a background task that logs them and, when configured,
//! appends them as JSON lines to a file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::result::FrameSuccess;
use crate::config::TrackingConfig;

/// Per-prediction metrics emitted to the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    pub detections_count: usize,
    pub processing_time: f64,
    /// Mean over records with confidence > 0, absent when none read anything
    pub average_recognition_confidence: Option<f64>,
    pub meets_performance_target: bool,
    /// Served from the prediction cache
    #[serde(default)]
    pub cached: bool,
    pub recorded_at: DateTime<Utc>,
}

impl PredictionMetrics {
    pub fn from_frame(frame: &FrameSuccess, performance_target_secs: f64) -> Self {
        Self {
            detections_count: frame.detections_count,
            processing_time: frame.processing_time,
            average_recognition_confidence: frame.average_recognition_confidence(),
            meets_performance_target: frame.processing_time <= performance_target_secs,
            cached: false,
            recorded_at: Utc::now(),
        }
    }
}

/// Best-effort sink for prediction metrics
///
/// Receives one record per successful prediction, cache hits included.
pub trait ExperimentTracker: Send + Sync {
    fn record(&self, metrics: PredictionMetrics);
}

/// Discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn record(&self, _metrics: PredictionMetrics) {}
}

/// Queue-backed tracker drained by a background task
#[derive(Debug, Clone)]
pub struct ChannelTracker {
    sender: mpsc::Sender<PredictionMetrics>,
}

impl ChannelTracker {
    /// Start the background writer; must be called inside a Tokio runtime
    ///
    /// The task ends once every clone of the tracker is dropped.
    pub fn spawn(config: &TrackingConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let handle = tokio::spawn(drain(receiver, config.output_path.clone()));
        (Self { sender }, handle)
    }
}

impl ExperimentTracker for ChannelTracker {
    fn record(&self, metrics: PredictionMetrics) {
        if let Err(e) = self.sender.try_send(metrics) {
            debug!("Dropping tracking record: {}", e);
        }
    }
}

async fn drain(mut receiver: mpsc::Receiver<PredictionMetrics>, output_path: Option<PathBuf>) {
    let mut file = match output_path {
        Some(ref path) => match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
        {
            Ok(file) => {
                info!("📈 Writing prediction metrics to {}", path.display());
                Some(file)
            }
            Err(e) => {
                warn!(
                    "⚠️ Cannot open tracking file {}: {}, logging only",
                    path.display(),
                    e
                );
                None
            }
        },
        None => None,
    };

    while let Some(metrics) = receiver.recv().await {
        debug!(
            detections_count = metrics.detections_count,
            processing_time = metrics.processing_time,
            average_recognition_confidence = ?metrics.average_recognition_confidence,
            meets_performance_target = metrics.meets_performance_target,
            cached = metrics.cached,
            "Prediction metrics"
        );

        if let Some(ref mut f) = file {
            let mut line = match serde_json::to_string(&metrics) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to serialize tracking record: {}", e);
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = f.write_all(line.as_bytes()).await {
                warn!("Failed to write tracking record: {}", e);
            } else if let Err(e) = f.flush().await {
                warn!("Failed to flush tracking file: {}", e);
            }
        }
    }
}
