// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision stages of the road sign pipeline
//!
//! This module provides:
//! - Image decoding into the canonical RGB buffer
//! - Sign detection via a YOLO-family ONNX model
//! - Geometric gating and padded cropping of detections
//! - Legibility enhancement of cropped regions
//! - Text recognition via Tesseract and label normalization
//!
//! Detection and recognition are blocking calls and are expected to run on
//! the blocking thread pool.

pub mod detection;
pub mod enhance;
pub mod geometry;
pub mod image_utils;
pub mod model_manager;
pub mod recognition;
pub mod roi;
pub mod text;

pub use detection::{DetectionCandidate, DetectionError, ObjectDetector, YoloDetector};
pub use enhance::LegibilityEnhancer;
pub use geometry::BoundingBox;
pub use image_utils::{decode_image_bytes, decode_input, detect_format, ImageError, ImageInfo, ImageInput};
pub use model_manager::VisionModelManager;
pub use recognition::{
    EngineError, RecognitionResult, TesseractEngine, TextEngine, TextRecognizer, WordToken,
};
pub use text::TextNormalizer;
