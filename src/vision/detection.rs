// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Road sign detection
//!
//! [`ObjectDetector`] is the seam the pipeline calls through. [`YoloDetector`]
//! runs a YOLOv8-family model exported to ONNX on CPU:
//! letterbox to a square input, decode `[1, 4 + classes, anchors]`, filter by
//! confidence, class-wise NMS, then map boxes back to source pixels.

use anyhow::{Context, Result};
use image::{imageops, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use super::geometry::BoundingBox;

/// Gray value used for letterbox padding
pub const LETTERBOX_FILL: u8 = 114;

/// Detector failures
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("No detection model loaded")]
    ModelUnavailable,

    #[error("Detection inference failed: {0}")]
    Inference(String),

    #[error("Unexpected detector output: {0}")]
    InvalidOutput(String),
}

/// One raw detector output in source image coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub bbox: BoundingBox,
    #[serde(serialize_with = "serialize_score")]
    pub confidence: f32,
    pub class_id: usize,
    pub class_name: String,
}

/// Write an `f32` score as the `f64` with the same shortest decimal form,
/// so 0.92 stays 0.92 instead of widening to 0.9200000166893005
fn serialize_score<S: serde::Serializer>(
    score: &f32,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let widened = score.to_string().parse::<f64>().unwrap_or(f64::from(*score));
    serializer.serialize_f64(widened)
}

/// Object detection model wrapper
pub trait ObjectDetector: Send + Sync {
    /// Detect objects, applying confidence and overlap thresholds
    fn detect(
        &self,
        image: &RgbImage,
        confidence_min: f32,
        overlap_max: f32,
    ) -> Result<Vec<DetectionCandidate>, DetectionError>;

    /// Human-readable model name for logs and health output
    fn name(&self) -> &str;
}

/// Human-readable name for a class id, `class_{id}` when unknown
pub fn class_name(names: &[String], class_id: usize) -> String {
    names
        .get(class_id)
        .filter(|n| !n.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class_id))
}

/// Load newline-separated class labels, line index = class id
pub fn load_class_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read class names from {}", path.display()))?;
    Ok(content.lines().map(|l| l.trim().to_string()).collect())
}

/// Scale and padding applied by [`letterbox`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Map coordinates from network input space back to the source image
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}

/// Resize preserving aspect ratio, center on a gray square, emit NCHW in [0, 1]
pub fn letterbox(image: &RgbImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();
    let size = target_size as usize;
    let mut tensor = Array4::<f32>::from_elem((1, 3, size, size), LETTERBOX_FILL as f32 / 255.0);

    let scale = (target_size as f32 / orig_w.max(1) as f32)
        .min(target_size as f32 / orig_h.max(1) as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);
    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    let info = LetterboxInfo {
        scale,
        offset_x,
        offset_y,
        original_width: orig_w,
        original_height: orig_h,
    };
    if orig_w == 0 || orig_h == 0 {
        return (tensor, info);
    }

    let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (tx, ty) = ((x + offset_x) as usize, (y + offset_y) as usize);
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}

/// Box in source coordinates before rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl ScoredBox {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &ScoredBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Decode a YOLOv8 head output into source-space boxes above `confidence_min`
///
/// Accepts `[1, 4 + C, N]` and the transposed `[1, N, 4 + C]` layout; the
/// smaller of the two trailing dimensions is taken as the attribute axis.
pub fn decode_output(
    output: ArrayViewD<f32>,
    info: &LetterboxInfo,
    confidence_min: f32,
) -> Result<Vec<ScoredBox>, DetectionError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectionError::InvalidOutput(format!(
            "expected [1, attrs, anchors], got {:?}",
            shape
        )));
    }

    let batch = output.index_axis(Axis(0), 0);
    let rows = if shape[1] <= shape[2] {
        batch
    } else {
        batch.reversed_axes()
    };
    let rows = rows
        .into_dimensionality::<Ix2>()
        .map_err(|e| DetectionError::InvalidOutput(e.to_string()))?;
    let attrs = rows.shape()[0];
    if attrs < 5 {
        return Err(DetectionError::InvalidOutput(format!(
            "need at least 5 attributes per anchor, got {}",
            attrs
        )));
    }

    let mut boxes = Vec::new();
    for anchor in rows.axis_iter(Axis(1)) {
        let (class_id, confidence) = anchor
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });

        if !(confidence >= confidence_min) {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = info.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = info.map_to_original(cx + w / 2.0, cy + h / 2.0);
        boxes.push(ScoredBox {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        });
    }
    Ok(boxes)
}

/// Class-wise non-maximum suppression, result sorted by descending confidence
pub fn non_max_suppression(mut boxes: Vec<ScoredBox>, overlap_max: f32) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<ScoredBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > overlap_max);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Round and clamp a source-space box to integer image coordinates
///
/// Returns `None` when nothing is left after clamping.
pub fn to_pixel_box(b: &ScoredBox, width: u32, height: u32) -> Option<BoundingBox> {
    let (w, h) = (width as f32, height as f32);
    let x1 = b.x1.clamp(0.0, w).round() as i64;
    let y1 = b.y1.clamp(0.0, h).round() as i64;
    let x2 = b.x2.clamp(0.0, w).round() as i64;
    let y2 = b.y2.clamp(0.0, h).round() as i64;
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(BoundingBox::new(x1, y1, x2, y2))
}

/// YOLOv8-family detector on ONNX Runtime
///
/// Runs on CPU only; the session is shared behind a mutex.
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Square network input size
    input_size: u32,
    /// Labels indexed by class id
    class_names: Vec<String>,
    /// Model file name, used in logs
    name: String,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("classes", &self.class_names.len())
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
        class_names: Vec<String>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load detection model from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input shape: {:?}", input.input_type);
        }

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "detector".to_string());

        info!(
            "✅ Detection model {} loaded (input {}x{}, {} labels)",
            name,
            input_size,
            input_size,
            class_names.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_size,
            class_names,
            name,
        })
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(
        &self,
        image: &RgbImage,
        confidence_min: f32,
        overlap_max: f32,
    ) -> Result<Vec<DetectionCandidate>, DetectionError> {
        let (tensor, info) = letterbox(image, self.input_size);

        let raw = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| DetectionError::Inference("session lock poisoned".into()))?;

            let input_value =
                Value::from_array(tensor).map_err(|e| DetectionError::Inference(e.to_string()))?;
            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .map_err(|e| DetectionError::Inference(e.to_string()))?;
            let output_tensor = outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| DetectionError::InvalidOutput(e.to_string()))?;

            decode_output(output_tensor.view(), &info, confidence_min)?
        };

        let (width, height) = image.dimensions();
        let candidates: Vec<DetectionCandidate> = non_max_suppression(raw, overlap_max)
            .iter()
            .filter_map(|b| {
                to_pixel_box(b, width, height).map(|bbox| DetectionCandidate {
                    bbox,
                    confidence: b.confidence,
                    class_id: b.class_id,
                    class_name: class_name(&self.class_names, b.class_id),
                })
            })
            .collect();

        debug!("{} detected {} candidates", self.name, candidates.len());
        Ok(candidates)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
