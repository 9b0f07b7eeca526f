// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint handlers

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::Multipart;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::response::{BatchItemResponse, PredictResponse};
use crate::api::errors::{ApiError, ServiceError};
use crate::api::http_server::AppState;
use crate::vision::ImageInput;

/// One uploaded multipart file
#[derive(Debug, Clone)]
pub struct Upload {
    pub field_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Check the declared content type and size, then wrap the payload
    pub fn into_input(self, max_bytes: usize) -> Result<ImageInput, ServiceError> {
        match self.content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => {}
            other => {
                return Err(ServiceError::UnsupportedMediaType(
                    other.unwrap_or("missing content type").to_string(),
                ))
            }
        }
        if self.bytes.len() > max_bytes {
            return Err(ServiceError::InvalidImage(format!(
                "Invalid image: upload is {} bytes (max: {} bytes)",
                self.bytes.len(),
                max_bytes
            )));
        }
        Ok(ImageInput::Bytes(self.bytes))
    }
}

/// Read multipart fields whose name is in `names`, in order
///
/// Stops once `limit` uploads are buffered; the rest of the body is never read.
async fn read_uploads(
    multipart: &mut Multipart,
    names: &[&str],
    limit: Option<usize>,
) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        if !names.contains(&field_name.as_str()) {
            debug!("Ignoring multipart field {:?}", field_name);
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {}", e)))?;
        uploads.push(Upload {
            field_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        if limit.is_some_and(|max| uploads.len() >= max) {
            break;
        }
    }
    Ok(uploads)
}

/// POST /predict - Detect road signs in one image and read their text
///
/// # Request
/// multipart/form-data with a `file` field holding the image
///
/// # Errors
/// - 400 Bad Request: missing file, non-image content type, undecodable image
/// - 503 Service Unavailable: no detection model loaded
/// - 500 Internal Server Error: prediction failed
pub async fn predict_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!("predict", request_id = %request_id);

    async move {
        let upload = match read_uploads(&mut multipart, &["file"], Some(1)).await {
            Ok(uploads) => uploads.into_iter().next(),
            Err(e) => return e.into_response_with_id(Some(request_id)),
        };
        let Some(upload) = upload else {
            return ApiError::InvalidRequest("multipart field `file` is required".to_string())
                .into_response_with_id(Some(request_id));
        };

        let input = match upload.into_input(state.max_upload_bytes) {
            Ok(input) => input,
            Err(e) => {
                warn!("Rejected upload: {}", e);
                return ApiError::from(e).into_response_with_id(Some(request_id));
            }
        };

        match state.service.predict(input).await {
            Ok(frame) => {
                info!(
                    detections_count = frame.detections_count,
                    processing_time = frame.processing_time,
                    "Prediction served"
                );
                Json(PredictResponse::new(request_id, frame)).into_response()
            }
            Err(e) => {
                warn!("Prediction failed: {}", e);
                ApiError::from(e).into_response_with_id(Some(request_id))
            }
        }
    }
    .instrument(span)
    .await
}

/// POST /predict/batch - Predict up to `max_batch_size` images
///
/// # Request
/// multipart/form-data with one `files` (or `file`) field per image
///
/// # Response
/// Array in input order; each entry is a prediction or
/// `{ success: false, error, error_type, request_id }`
///
/// # Errors
/// - 503 Service Unavailable: no detection model loaded
/// - 400 Bad Request: more than `max_batch_size` images
pub async fn predict_batch_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let batch_id = Uuid::new_v4().to_string();
    let span = info_span!("predict_batch", request_id = %batch_id);

    async move {
        let uploads = match read_uploads(&mut multipart, &["files", "file"], None).await {
            Ok(uploads) => uploads,
            Err(e) => return e.into_response_with_id(Some(batch_id)),
        };
        info!("Batch prediction with {} images", uploads.len());

        let items: Vec<Result<ImageInput, ServiceError>> = uploads
            .into_iter()
            .map(|upload| upload.into_input(state.max_upload_bytes))
            .collect();

        match state.service.predict_batch(items).await {
            Ok(results) => {
                let body: Vec<BatchItemResponse> = results
                    .into_iter()
                    .enumerate()
                    .map(|(i, result)| {
                        BatchItemResponse::from_result(format!("{}_{}", batch_id, i), result)
                    })
                    .collect();
                Json(body).into_response()
            }
            Err(e) => {
                warn!("Batch rejected: {}", e);
                ApiError::from(e).into_response_with_id(Some(batch_id))
            }
        }
    }
    .instrument(span)
    .await
}
