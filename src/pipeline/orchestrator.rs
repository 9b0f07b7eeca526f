// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-image inference flow
//!
//! decode -> detect -> validate -> (extract -> enhance -> recognize) -> fuse
//!
//! Detection and each candidate's crop/enhance/recognize chain run on the
//! bounded worker pool. Candidates are processed concurrently and fused back
//! in detector order. Every call ends in exactly one [`FrameResult`].

use futures::future::join_all;
use futures::FutureExt;
use image::RgbImage;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::cache::{fingerprint, CacheStats, PredictionCache};
use super::result::{FrameResult, FrameSuccess, PipelineError, PredictionRecord};
use super::tracker::{ExperimentTracker, PredictionMetrics};
use super::workers::WorkerPool;
use crate::config::{PipelineConfig, DEFAULT_MAX_UPLOAD_BYTES};
use crate::vision::{
    decode_input, roi, DetectionCandidate, ImageInput, LegibilityEnhancer, ObjectDetector,
    RecognitionResult, TextNormalizer, TextRecognizer, VisionModelManager,
};

/// Road sign detection + recognition pipeline
///
/// Stateless per call apart from the optional result cache; safe to share
/// behind an `Arc` across requests.
pub struct InferencePipeline {
    config: Arc<PipelineConfig>,
    detector: Option<Arc<dyn ObjectDetector>>,
    enhancer: Arc<LegibilityEnhancer>,
    recognizer: Arc<TextRecognizer>,
    workers: WorkerPool,
    cache: Option<PredictionCache>,
    tracker: Arc<dyn ExperimentTracker>,
    /// Largest encoded image accepted by the decoder
    max_image_bytes: usize,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("detector", &self.detector.as_ref().map(|d| d.name().to_string()))
            .field("workers", &self.workers.size())
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl InferencePipeline {
    pub fn new(
        config: PipelineConfig,
        models: &VisionModelManager,
        tracker: Arc<dyn ExperimentTracker>,
    ) -> Self {
        let normalizer = TextNormalizer::new(&config.text);
        let recognizer = TextRecognizer::new(models.text_engine(), normalizer);
        let enhancer = LegibilityEnhancer::new(config.enhance.clone());
        let workers = WorkerPool::new(config.performance.resolved_workers());
        let cache = config
            .performance
            .enable_cache
            .then(|| PredictionCache::new(config.performance.cache_capacity));

        info!(
            "Inference pipeline ready (detector: {}, workers: {}, cache: {})",
            models.has_detector(),
            workers.size(),
            cache.is_some()
        );

        Self {
            config: Arc::new(config),
            detector: models.detector(),
            enhancer: Arc::new(enhancer),
            recognizer: Arc::new(recognizer),
            workers,
            cache,
            tracker,
            max_image_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Accept encoded images up to `max_bytes`, normally the service upload cap
    pub fn with_max_image_bytes(mut self, max_bytes: usize) -> Self {
        self.max_image_bytes = max_bytes;
        self
    }

    /// Whether a detector is loaded
    pub fn is_loaded(&self) -> bool {
        self.detector.is_some()
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match self.cache {
            Some(ref cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Run the full pipeline on one image
    pub async fn predict(&self, input: ImageInput) -> FrameResult {
        let start = Instant::now();

        let key = match self.cache {
            Some(_) => fingerprint(&input),
            None => None,
        };
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(mut frame) = cache.get(key).await {
                frame.processing_time = start.elapsed().as_secs_f64();
                debug!(detections_count = frame.detections_count, "cache_hit");
                self.tracker.record(PredictionMetrics {
                    cached: true,
                    ..PredictionMetrics::from_frame(
                        &frame,
                        self.config.performance.performance_target_secs,
                    )
                });
                return FrameResult::Success(frame);
            }
        }

        let outcome = AssertUnwindSafe(self.process(input, start))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(PipelineError::Task("image processing panicked".into())));

        match outcome {
            Ok(frame) => {
                info!(
                    detections_count = frame.detections_count,
                    processing_time = frame.processing_time,
                    "Prediction complete"
                );
                self.tracker.record(PredictionMetrics::from_frame(
                    &frame,
                    self.config.performance.performance_target_secs,
                ));
                if let (Some(cache), Some(key)) = (&self.cache, key) {
                    cache.put(key, frame.clone()).await;
                }
                FrameResult::Success(frame)
            }
            Err(e) => {
                warn!(kind = e.kind().as_str(), "Prediction failed: {}", e);
                FrameResult::failure(&e, start.elapsed().as_secs_f64())
            }
        }
    }

    /// Run every image independently; output order matches input order
    pub async fn predict_batch(&self, inputs: Vec<ImageInput>) -> Vec<FrameResult> {
        join_all(inputs.into_iter().map(|input| self.predict(input))).await
    }

    async fn process(&self, input: ImageInput, start: Instant) -> Result<FrameSuccess, PipelineError> {
        let (image, _info) = decode_input(&input, self.max_image_bytes)?;
        let (width, height) = image.dimensions();
        let image = Arc::new(image);

        let candidates = self.detect(image.clone()).await?;
        let detected = candidates.len();

        let roi_config = &self.config.roi;
        let valid: Vec<DetectionCandidate> = candidates
            .into_iter()
            .filter(|c| {
                c.bbox
                    .is_valid((height, width), roi_config.min_area, roi_config.max_aspect_ratio)
            })
            .collect();
        debug!(
            "{} of {} candidates passed geometric validation",
            valid.len(),
            detected
        );

        let records = join_all(
            valid
                .into_iter()
                .map(|candidate| self.read_candidate(image.clone(), candidate)),
        )
        .await;

        Ok(FrameSuccess::new(
            [height, width, 3],
            records,
            start.elapsed().as_secs_f64(),
        ))
    }

    async fn detect(&self, image: Arc<RgbImage>) -> Result<Vec<DetectionCandidate>, PipelineError> {
        let detector = self.detector.clone().ok_or(PipelineError::ModelUnavailable)?;
        let confidence_min = self.config.detection.confidence_min;
        let overlap_max = self.config.detection.overlap_max;

        let candidates = self
            .workers
            .run(move || detector.detect(&image, confidence_min, overlap_max))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;
        Ok(candidates)
    }

    /// Crop, enhance and recognize one candidate; failures yield empty text
    async fn read_candidate(&self, image: Arc<RgbImage>, candidate: DetectionCandidate) -> PredictionRecord {
        let bbox = candidate.bbox;
        let padding = self.config.roi.padding_ratio;
        let enhancer = self.enhancer.clone();
        let recognizer = self.recognizer.clone();

        let ocr = self
            .workers
            .run(move || {
                let crop = roi::extract(&image, &bbox, padding);
                let enhanced = enhancer.enhance(&crop);
                recognizer.recognize(&enhanced)
            })
            .await
            .unwrap_or_else(|e| {
                warn!("Recognition task for {:?} failed: {}", bbox, e);
                RecognitionResult::empty()
            });

        PredictionRecord::fuse(candidate, ocr)
    }
}
