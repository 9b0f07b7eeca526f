// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end frame processing with stand-in models

use super::support::*;
use roadsign_node::config::PipelineConfig;
use roadsign_node::pipeline::{FailureKind, FrameResult};
use roadsign_node::vision::{ImageInput, ObjectDetector};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_valid_detections_are_read_and_fused() {
    let detector = Arc::new(FixedDetector::new(vec![
        candidate([100, 100, 200, 200], 0.9),
        // too small
        candidate([0, 0, 5, 5], 0.8),
        // too wide
        candidate([0, 300, 600, 320], 0.7),
        candidate([300, 50, 400, 150], 0.6),
    ]));
    let pipeline = build_pipeline(Some(detector), stop_engine(), uncached_config());

    let frame = match pipeline.predict(ImageInput::Bytes(frame_png())).await {
        FrameResult::Success(frame) => frame,
        FrameResult::Failure(f) => panic!("unexpected failure: {}", f.error),
    };

    assert_eq!(frame.image_shape, [480, 640, 3]);
    assert_eq!(frame.detections_count, 2);
    assert_eq!(frame.results.len(), 2);
    assert_eq!(frame.results[0].detection.confidence, 0.9);
    assert_eq!(frame.results[1].detection.confidence, 0.6);

    for record in &frame.results {
        assert!(record.has_text);
        assert_eq!(record.ocr.text, "STOP");
        assert_eq!(record.ocr.raw_text, "stop sign");
        assert_eq!(record.ocr.word_count, 2);
        assert!((record.ocr.confidence - 0.8).abs() < 1e-9);
    }
    assert!(frame.processing_time >= 0.0);
    assert_eq!(frame.pipeline_version, "1.0.0");
}

#[tokio::test]
async fn test_confidence_threshold_is_forwarded_to_detector() {
    let detector = Arc::new(FixedDetector::new(vec![
        candidate([100, 100, 200, 200], 0.9),
        candidate([300, 50, 400, 150], 0.2),
    ]));
    let mut config = uncached_config();
    config.detection.confidence_min = 0.5;
    let pipeline = build_pipeline(Some(detector), stop_engine(), config);

    let result = pipeline.predict(ImageInput::Bytes(frame_png())).await;
    assert!(result.is_success());
    assert_eq!(result.detections_count(), 1);
}

#[tokio::test]
async fn test_blank_recognition_still_reports_detection() {
    let detector = Arc::new(FixedDetector::new(vec![candidate([100, 100, 200, 200], 0.9)]));
    let engine = Arc::new(FixedEngine {
        words: vec![],
    });
    let pipeline = build_pipeline(Some(detector), engine, uncached_config());

    let result = pipeline.predict(ImageInput::Bytes(frame_png())).await;
    let record = &result.results()[0];
    assert!(!record.has_text);
    assert_eq!(record.ocr.text, "");
    assert_eq!(record.ocr.confidence, 0.0);
}

#[tokio::test]
async fn test_missing_detector_fails_frame() {
    let pipeline = build_pipeline(None, stop_engine(), uncached_config());
    match pipeline.predict(ImageInput::Bytes(frame_png())).await {
        FrameResult::Failure(failure) => {
            assert_eq!(failure.kind, FailureKind::ModelUnavailable);
            assert_eq!(failure.detections_count, 0);
            assert!(failure.results.is_empty());
        }
        FrameResult::Success(_) => panic!("expected failure without a detector"),
    }
}

#[tokio::test]
async fn test_corrupt_bytes_fail_as_invalid_image() {
    let detector = Arc::new(FixedDetector::new(vec![]));
    let pipeline = build_pipeline(Some(detector), stop_engine(), uncached_config());
    match pipeline.predict(ImageInput::Bytes(b"definitely not an image".to_vec())).await {
        FrameResult::Failure(failure) => assert_eq!(failure.kind, FailureKind::InvalidImage),
        FrameResult::Success(_) => panic!("expected failure on corrupt bytes"),
    }
}

#[tokio::test]
async fn test_repeated_frame_served_from_cache() {
    let detector = Arc::new(FixedDetector::new(vec![candidate([100, 100, 200, 200], 0.9)]));
    let mut config = PipelineConfig::default();
    config.tracking.enabled = false;
    let pipeline = build_pipeline(
        Some(detector.clone() as Arc<dyn ObjectDetector>),
        stop_engine(),
        config,
    );

    let first = pipeline.predict(ImageInput::Bytes(frame_png())).await;
    let second = pipeline.predict(ImageInput::Bytes(frame_png())).await;

    assert_eq!(first.results(), second.results());
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    let stats = pipeline.cache_stats().await.unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}
