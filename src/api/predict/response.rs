// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction response types

use serde::{Deserialize, Serialize};

use crate::api::errors::ServiceError;
use crate::pipeline::FrameSuccess;

/// Successful prediction for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Always true
    pub success: bool,
    pub request_id: String,
    #[serde(flatten)]
    pub frame: FrameSuccess,
}

impl PredictResponse {
    pub fn new(request_id: String, frame: FrameSuccess) -> Self {
        Self {
            success: true,
            request_id,
            frame,
        }
    }
}

/// Failed item of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemError {
    /// Always false
    pub success: bool,
    pub error: String,
    pub error_type: String,
    pub request_id: String,
}

impl BatchItemError {
    pub fn new(request_id: String, err: &ServiceError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            error_type: err.error_type().to_string(),
            request_id,
        }
    }
}

/// One entry of a batch response, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItemResponse {
    Success(PredictResponse),
    Failure(BatchItemError),
}

impl BatchItemResponse {
    pub fn from_result(request_id: String, result: Result<FrameSuccess, ServiceError>) -> Self {
        match result {
            Ok(frame) => BatchItemResponse::Success(PredictResponse::new(request_id, frame)),
            Err(e) => BatchItemResponse::Failure(BatchItemError::new(request_id, &e)),
        }
    }
}
