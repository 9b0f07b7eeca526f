// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::pipeline::{FailureKind, FrameFailure};

/// Request-level failures of the prediction service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// Message is passed through as produced by the decoder or upload check
    #[error("{0}")]
    InvalidImage(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Prediction pipeline is not loaded")]
    ModelUnavailable,

    #[error("Too many items: {count} (max: {limit})")]
    TooManyItems { count: usize, limit: usize },

    #[error("{0}")]
    PipelineFailure(String),
}

impl ServiceError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ServiceError::InvalidImage(_) => "invalid_image",
            ServiceError::UnsupportedMediaType(_) => "unsupported_media_type",
            ServiceError::ModelUnavailable => "model_unavailable",
            ServiceError::TooManyItems { .. } => "too_many_items",
            ServiceError::PipelineFailure(_) => "pipeline_failure",
        }
    }
}

impl From<&FrameFailure> for ServiceError {
    fn from(failure: &FrameFailure) -> Self {
        match failure.kind {
            FailureKind::InvalidImage => ServiceError::InvalidImage(failure.error.clone()),
            FailureKind::ModelUnavailable => ServiceError::ModelUnavailable,
            FailureKind::PipelineFailure => ServiceError::PipelineFailure(failure.error.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    Service(ServiceError),
    InvalidRequest(String),
    NotFound(String),
    InternalError(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::Service(err @ ServiceError::TooManyItems { count, limit }) => {
                let mut details = HashMap::new();
                details.insert("count".to_string(), serde_json::Value::from(*count));
                details.insert("limit".to_string(), serde_json::Value::from(*limit));
                (err.error_type(), err.to_string(), Some(details))
            }
            ApiError::Service(err) => (err.error_type(), err.to_string(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Service(ServiceError::InvalidImage(_))
            | ApiError::Service(ServiceError::UnsupportedMediaType(_))
            | ApiError::Service(ServiceError::TooManyItems { .. })
            | ApiError::InvalidRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Service(ServiceError::ModelUnavailable) => 503,
            ApiError::Service(ServiceError::PipelineFailure(_)) | ApiError::InternalError(_) => {
                500
            }
        }
    }

    /// HTTP response carrying the request id
    pub fn into_response_with_id(self, request_id: Option<String>) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response(request_id))).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Service(err) => write!(f, "{}", err),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_id(None)
    }
}
