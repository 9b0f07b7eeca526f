// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health and GET /metrics

use super::support::*;
use axum::http::StatusCode;
use tower::util::ServiceExt; // for `oneshot`

#[tokio::test]
async fn test_health_is_degraded_without_models() {
    let response = degraded_app().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["pipeline_loaded"], false);
    assert_eq!(body["text_engine_available"], false);
    assert_eq!(body["total_predictions"], 0);
    assert_eq!(body["version"], "1.0.0");
}

#[tokio::test]
async fn test_health_is_healthy_with_models() {
    let body = json_body(loaded_app().oneshot(get_request("/health")).await.unwrap()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["pipeline_loaded"], true);
}

#[tokio::test]
async fn test_metrics_reflect_served_predictions() {
    let app = loaded_app();

    let response = app
        .clone()
        .oneshot(multipart_request("/predict", vec![Part::png("file")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bad = Part {
        name: "file",
        content_type: "image/png",
        data: vec![1, 2, 3],
    };
    let response = app
        .clone()
        .oneshot(multipart_request("/predict", vec![bad]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(app.oneshot(get_request("/metrics")).await.unwrap()).await;
    assert_eq!(body["total_predictions"], 1);
    assert_eq!(body["total_detections"], 1);
    assert_eq!(body["failed_predictions"], 1);
    assert_eq!(body["pipeline_status"], "loaded");
    assert!(body["average_processing_time"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_metrics_without_model() {
    let body = json_body(degraded_app().oneshot(get_request("/metrics")).await.unwrap()).await;
    assert_eq!(body["pipeline_status"], "not_loaded");
    assert_eq!(body["average_processing_time"], 0.0);
}
