// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference pipeline orchestration, result records and side channels

pub mod cache;
pub mod orchestrator;
pub mod result;
pub mod tracker;
pub mod workers;

pub use cache::{fingerprint, CacheStats, PredictionCache};
pub use orchestrator::InferencePipeline;
pub use result::{
    FailureKind, FrameFailure, FrameResult, FrameSuccess, PipelineError, PredictionRecord,
};
pub use tracker::{ChannelTracker, ExperimentTracker, NoopTracker, PredictionMetrics};
pub use workers::{WorkerError, WorkerPool};
