// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction service: pipeline invocation, statistics, batch fan-out
//!
//! Transport independent; the HTTP handlers only decode requests and encode
//! what this layer returns.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::ServiceError;
use super::stats::ServiceStatistics;
use crate::config::ServiceConfig;
use crate::pipeline::{FrameResult, FrameSuccess, InferencePipeline};
use crate::version::VERSION_NUMBER;
use crate::vision::ImageInput;

/// Outcome of one item of a batch
pub type BatchItemResult = Result<FrameSuccess, ServiceError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// "healthy" or "degraded"
    pub status: String,
    pub pipeline_loaded: bool,
    pub text_engine_available: bool,
    /// Seconds since start
    pub uptime: f64,
    pub total_predictions: u64,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub total_predictions: u64,
    pub total_detections: u64,
    pub failed_predictions: u64,
    pub average_processing_time: f64,
    pub uptime: f64,
    /// "loaded" or "not_loaded"
    pub pipeline_status: String,
}

pub struct PredictionService {
    pipeline: Arc<InferencePipeline>,
    stats: ServiceStatistics,
    text_engine_available: bool,
    max_batch_size: usize,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("pipeline", &self.pipeline)
            .field("text_engine_available", &self.text_engine_available)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

impl PredictionService {
    pub fn new(
        pipeline: Arc<InferencePipeline>,
        stats: ServiceStatistics,
        config: &ServiceConfig,
        text_engine_available: bool,
    ) -> Self {
        Self {
            pipeline,
            stats,
            text_engine_available,
            max_batch_size: config.max_batch_size,
        }
    }

    pub fn pipeline(&self) -> &InferencePipeline {
        &self.pipeline
    }

    pub fn statistics(&self) -> &ServiceStatistics {
        &self.stats
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.is_loaded()
    }

    /// Predict one image, updating statistics with the outcome
    pub async fn predict(&self, input: ImageInput) -> Result<FrameSuccess, ServiceError> {
        if !self.pipeline.is_loaded() {
            return Err(ServiceError::ModelUnavailable);
        }

        match self.pipeline.predict(input).await {
            FrameResult::Success(frame) => {
                self.stats
                    .record_success(frame.detections_count, frame.processing_time)
                    .await;
                Ok(frame)
            }
            FrameResult::Failure(failure) => {
                self.stats.record_failure().await;
                Err(ServiceError::from(&failure))
            }
        }
    }

    /// Predict up to `max_batch_size` images, isolating per-item failures
    ///
    /// Items already rejected while decoding the request are passed through
    /// as errors in their original position.
    pub async fn predict_batch(
        &self,
        items: Vec<Result<ImageInput, ServiceError>>,
    ) -> Result<Vec<BatchItemResult>, ServiceError> {
        if !self.pipeline.is_loaded() {
            return Err(ServiceError::ModelUnavailable);
        }
        if items.len() > self.max_batch_size {
            warn!(
                "Rejecting batch of {} items (max: {})",
                items.len(),
                self.max_batch_size
            );
            return Err(ServiceError::TooManyItems {
                count: items.len(),
                limit: self.max_batch_size,
            });
        }

        debug!("Processing batch of {} items", items.len());
        let results = join_all(items.into_iter().map(|item| async move {
            match item {
                Ok(input) => self.predict(input).await,
                Err(e) => Err(e),
            }
        }))
        .await;
        Ok(results)
    }

    pub async fn health(&self) -> HealthReport {
        let snapshot = self.stats.snapshot().await;
        let pipeline_loaded = self.pipeline.is_loaded();
        let status = if pipeline_loaded && self.text_engine_available {
            "healthy"
        } else {
            "degraded"
        };

        HealthReport {
            status: status.to_string(),
            pipeline_loaded,
            text_engine_available: self.text_engine_available,
            uptime: snapshot.uptime,
            total_predictions: snapshot.total_predictions,
            version: VERSION_NUMBER.to_string(),
        }
    }

    pub async fn metrics(&self) -> MetricsReport {
        let snapshot = self.stats.snapshot().await;
        MetricsReport {
            total_predictions: snapshot.total_predictions,
            total_detections: snapshot.total_detections,
            failed_predictions: snapshot.failed_predictions,
            average_processing_time: snapshot.average_processing_time(),
            uptime: snapshot.uptime,
            pipeline_status: if self.pipeline.is_loaded() {
                "loaded".to_string()
            } else {
                "not_loaded".to_string()
            },
        }
    }
}
