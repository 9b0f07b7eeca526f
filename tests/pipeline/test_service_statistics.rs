// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Counters exposed through health and metrics

use super::support::*;
use roadsign_node::api::{PredictionService, ServiceStatistics};
use roadsign_node::config::ServiceConfig;
use roadsign_node::vision::ImageInput;
use std::sync::Arc;

fn service_with_detections(count: usize) -> PredictionService {
    let candidates = (0..count)
        .map(|i| candidate([10 + 60 * i as i64, 10, 60 + 60 * i as i64, 60], 0.9))
        .collect();
    let detector = Arc::new(FixedDetector::new(candidates));
    PredictionService::new(
        Arc::new(build_pipeline(Some(detector), stop_engine(), uncached_config())),
        ServiceStatistics::new(),
        &ServiceConfig::default(),
        true,
    )
}

#[tokio::test]
async fn test_successes_accumulate_detections_and_time() {
    let service = service_with_detections(3);
    for _ in 0..4 {
        service.predict(ImageInput::Bytes(frame_png())).await.unwrap();
    }

    let metrics = service.metrics().await;
    assert_eq!(metrics.total_predictions, 4);
    assert_eq!(metrics.total_detections, 12);
    assert_eq!(metrics.failed_predictions, 0);
    assert!(metrics.average_processing_time > 0.0);
    assert_eq!(metrics.pipeline_status, "loaded");
}

#[tokio::test]
async fn test_failures_are_counted_separately() {
    let service = service_with_detections(1);
    service.predict(ImageInput::Bytes(frame_png())).await.unwrap();
    assert!(service.predict(ImageInput::Bytes(vec![1, 2, 3])).await.is_err());

    let snapshot = service.statistics().snapshot().await;
    assert_eq!(snapshot.total_predictions, 1);
    assert_eq!(snapshot.failed_predictions, 1);
    assert_eq!(snapshot.total_detections, 1);
}

#[tokio::test]
async fn test_concurrent_predictions_all_counted() {
    let service = Arc::new(service_with_detections(2));
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.predict(ImageInput::Bytes(frame_png())).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let health = service.health().await;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.total_predictions, 8);
    assert_eq!(service.metrics().await.total_detections, 16);
}
