// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame results and per-image pipeline errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::PIPELINE_VERSION;
use crate::vision::{DetectionCandidate, DetectionError, ImageError, RecognitionResult};

/// One validated detection fused with the text read inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(flatten)]
    pub detection: DetectionCandidate,
    pub ocr: RecognitionResult,
    pub has_text: bool,
}

impl PredictionRecord {
    pub fn fuse(detection: DetectionCandidate, ocr: RecognitionResult) -> Self {
        let has_text = ocr.has_text();
        Self {
            detection,
            ocr,
            has_text,
        }
    }
}

/// Category of an unrecoverable per-image failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidImage,
    ModelUnavailable,
    PipelineFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidImage => "invalid_image",
            FailureKind::ModelUnavailable => "model_unavailable",
            FailureKind::PipelineFailure => "pipeline_failure",
        }
    }
}

/// Errors that end the processing of one image
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error("No detection model loaded")]
    ModelUnavailable,

    #[error("Detection failed: {0}")]
    Detection(DetectionError),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}

impl From<DetectionError> for PipelineError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::ModelUnavailable => PipelineError::ModelUnavailable,
            other => PipelineError::Detection(other),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::InvalidImage(_) => FailureKind::InvalidImage,
            PipelineError::ModelUnavailable => FailureKind::ModelUnavailable,
            PipelineError::Detection(_) | PipelineError::Task(_) => FailureKind::PipelineFailure,
        }
    }
}

/// Successful output for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSuccess {
    /// `[height, width, channels]`
    pub image_shape: [u32; 3],
    /// Number of candidates that passed geometric validation
    pub detections_count: usize,
    /// In detector order
    pub results: Vec<PredictionRecord>,
    /// Wall-clock seconds
    pub processing_time: f64,
    pub pipeline_version: String,
}

impl FrameSuccess {
    pub fn new(image_shape: [u32; 3], results: Vec<PredictionRecord>, processing_time: f64) -> Self {
        Self {
            image_shape,
            detections_count: results.len(),
            results,
            processing_time,
            pipeline_version: PIPELINE_VERSION.to_string(),
        }
    }

    /// Mean recognition confidence over records that read anything
    pub fn average_recognition_confidence(&self) -> Option<f64> {
        let confident: Vec<f64> = self
            .results
            .iter()
            .map(|r| r.ocr.confidence)
            .filter(|c| *c > 0.0)
            .collect();
        if confident.is_empty() {
            None
        } else {
            Some(confident.iter().sum::<f64>() / confident.len() as f64)
        }
    }
}

/// Error output for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFailure {
    pub error: String,
    pub kind: FailureKind,
    pub detections_count: usize,
    pub results: Vec<PredictionRecord>,
    pub processing_time: f64,
}

/// Complete output for one image, the only two outcomes of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameResult {
    Success(FrameSuccess),
    Failure(FrameFailure),
}

impl FrameResult {
    pub fn failure(err: &PipelineError, processing_time: f64) -> Self {
        FrameResult::Failure(FrameFailure {
            error: err.to_string(),
            kind: err.kind(),
            detections_count: 0,
            results: Vec::new(),
            processing_time,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FrameResult::Success(_))
    }

    pub fn detections_count(&self) -> usize {
        match self {
            FrameResult::Success(s) => s.detections_count,
            FrameResult::Failure(f) => f.detections_count,
        }
    }

    pub fn processing_time(&self) -> f64 {
        match self {
            FrameResult::Success(s) => s.processing_time,
            FrameResult::Failure(f) => f.processing_time,
        }
    }

    pub fn results(&self) -> &[PredictionRecord] {
        match self {
            FrameResult::Success(s) => &s.results,
            FrameResult::Failure(f) => &f.results,
        }
    }
}
