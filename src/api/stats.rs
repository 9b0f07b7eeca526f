// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide prediction counters
//!
//! Owned by the service and injected as an `Arc`. Each update takes the write
//! lock once; readers get a consistent, possibly slightly stale, copy.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
struct Counters {
    total_predictions: u64,
    total_detections: u64,
    total_processing_time: f64,
    failed_predictions: u64,
}

/// Consistent copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_predictions: u64,
    pub total_detections: u64,
    pub total_processing_time: f64,
    pub failed_predictions: u64,
    /// Seconds since the statistics were created
    pub uptime: f64,
}

impl StatisticsSnapshot {
    /// Mean processing time of successful predictions, 0.0 before the first
    pub fn average_processing_time(&self) -> f64 {
        if self.total_predictions > 0 {
            self.total_processing_time / self.total_predictions as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceStatistics {
    counters: Arc<RwLock<Counters>>,
    start_time: Instant,
}

impl Default for ServiceStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceStatistics {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(Counters::default())),
            start_time: Instant::now(),
        }
    }

    /// Count one completed prediction
    pub async fn record_success(&self, detections: usize, processing_time: f64) {
        let mut counters = self.counters.write().await;
        counters.total_predictions += 1;
        counters.total_detections += detections as u64;
        counters.total_processing_time += processing_time;
    }

    /// Count one attempted prediction that ended in an error frame
    pub async fn record_failure(&self) {
        self.counters.write().await.failed_predictions += 1;
    }

    pub async fn snapshot(&self) -> StatisticsSnapshot {
        let counters = *self.counters.read().await;
        StatisticsSnapshot {
            total_predictions: counters.total_predictions,
            total_detections: counters.total_detections,
            total_processing_time: counters.total_processing_time,
            failed_predictions: counters.failed_predictions,
            uptime: self.start_time.elapsed().as_secs_f64(),
        }
    }
}
