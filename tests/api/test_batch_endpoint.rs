// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /predict/batch

use super::support::*;
use axum::http::StatusCode;
use tower::util::ServiceExt; // for `oneshot`

fn png_parts(count: usize) -> Vec<Part<'static>> {
    (0..count).map(|_| Part::png("files")).collect()
}

#[tokio::test]
async fn test_full_batch_is_processed() {
    let response = loaded_app()
        .oneshot(multipart_request("/predict/batch", png_parts(10)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 10);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item["success"], true);
        assert_eq!(item["detections_count"], 1);
        assert!(item["request_id"]
            .as_str()
            .is_some_and(|id| id.ends_with(&format!("_{}", i))));
    }
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let response = loaded_app()
        .oneshot(multipart_request("/predict/batch", png_parts(11)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error_type"], "too_many_items");
    assert_eq!(body["details"]["count"], 11);
    assert_eq!(body["details"]["limit"], 10);
}

#[tokio::test]
async fn test_bad_items_fail_in_place() {
    let parts = vec![
        Part::png("files"),
        Part {
            name: "files",
            content_type: "image/jpeg",
            data: vec![0xff, 0xd8, 0x00, 0x01],
        },
        Part {
            name: "files",
            content_type: "application/pdf",
            data: b"%PDF-1.4".to_vec(),
        },
        Part::png("file"),
    ];
    let response = loaded_app()
        .oneshot(multipart_request("/predict/batch", parts))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0]["success"], true);
    assert_eq!(items[1]["success"], false);
    assert_eq!(items[1]["error_type"], "invalid_image");
    assert_eq!(items[2]["success"], false);
    assert_eq!(items[2]["error_type"], "unsupported_media_type");
    assert_eq!(items[3]["success"], true);
}

#[tokio::test]
async fn test_batch_without_model_is_unavailable() {
    let response = degraded_app()
        .oneshot(multipart_request("/predict/batch", png_parts(11)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_empty_batch_returns_empty_array() {
    let response = loaded_app()
        .oneshot(multipart_request("/predict/batch", vec![]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!([]));
}
