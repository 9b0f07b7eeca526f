// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition on enhanced sign crops
//!
//! [`TextEngine`] is the seam to the external OCR engine; [`TesseractEngine`]
//! drives the `tesseract` CLI in TSV mode. [`TextRecognizer`] turns word
//! tokens into a [`RecognitionResult`] and never fails: any engine error is
//! downgraded to the empty result.

use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::text::TextNormalizer;
use crate::config::RecognitionConfig;

/// Text engine failures
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to prepare engine input: {0}")]
    Input(String),

    #[error("Failed to run {binary}: {message}")]
    Spawn { binary: String, message: String },

    #[error("Text engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// One recognized word with the engine's confidence (0-100)
#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    pub text: String,
    pub confidence: f32,
}

impl WordToken {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Word-level OCR engine
#[cfg_attr(test, mockall::automock)]
pub trait TextEngine: Send + Sync {
    /// Recognize words in a single-channel image
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<WordToken>, EngineError>;

    /// Check the engine is installed, returning its version line
    fn probe(&self) -> Result<String, EngineError>;
}

/// Text read from one sign crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Normalized label
    pub text: String,
    /// Mean word confidence in [0, 1]
    pub confidence: f64,
    /// Surviving words joined by single spaces, before normalization
    pub raw_text: String,
    pub word_count: usize,
}

impl RecognitionResult {
    /// The designated "no text" value
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            raw_text: String::new(),
            word_count: 0,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Tesseract CLI engine
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: RecognitionConfig,
}

impl TesseractEngine {
    pub fn new(config: RecognitionConfig) -> Self {
        Self { config }
    }

    fn run(&self, path: &std::path::Path) -> Result<String, EngineError> {
        let output = Command::new(&self.config.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .arg("--oem")
            .arg(self.config.engine_mode.to_string())
            .arg("--psm")
            .arg(self.config.page_segmentation_mode.to_string())
            .arg("tsv")
            .output()
            .map_err(|e| EngineError::Spawn {
                binary: self.config.binary.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TextEngine for TesseractEngine {
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<WordToken>, EngineError> {
        let tmp = tempfile::Builder::new()
            .prefix("roadsign-roi-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| EngineError::Input(e.to_string()))?;
        image
            .save_with_format(tmp.path(), ImageFormat::Png)
            .map_err(|e| EngineError::Input(e.to_string()))?;

        let tsv = self.run(tmp.path())?;
        Ok(parse_tsv_words(&tsv))
    }

    fn probe(&self) -> Result<String, EngineError> {
        let output = Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .map_err(|e| EngineError::Spawn {
                binary: self.config.binary.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // older releases print the version on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stdout.trim().is_empty() { stderr } else { stdout };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}

/// Parse word rows (level 5) of Tesseract TSV output
///
/// Columns: level, page, block, par, line, word, left, top, width, height,
/// conf, text. Rows without a text column are skipped.
pub fn parse_tsv_words(tsv: &str) -> Vec<WordToken> {
    tsv.lines()
        .skip(1)
        .filter_map(|row| {
            let cols: Vec<&str> = row.split('\t').collect();
            if cols.len() < 12 || cols[0].trim() != "5" {
                return None;
            }
            let confidence: f32 = cols[10].trim().parse().unwrap_or(-1.0);
            Some(WordToken::new(cols[11].trim(), confidence))
        })
        .collect()
}

/// Runs the engine and folds its words into a [`RecognitionResult`]
#[derive(Clone)]
pub struct TextRecognizer {
    engine: Arc<dyn TextEngine>,
    normalizer: TextNormalizer,
}

impl std::fmt::Debug for TextRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRecognizer")
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl TextRecognizer {
    pub fn new(engine: Arc<dyn TextEngine>, normalizer: TextNormalizer) -> Self {
        Self { engine, normalizer }
    }

    pub fn recognize(&self, image: &GrayImage) -> RecognitionResult {
        if image.width() == 0 || image.height() == 0 {
            return RecognitionResult::empty();
        }

        let words = match self.engine.recognize_words(image) {
            Ok(words) => words,
            Err(e) => {
                warn!("Text recognition failed, returning empty result: {}", e);
                return RecognitionResult::empty();
            }
        };

        let kept: Vec<&WordToken> = words
            .iter()
            .filter(|w| w.confidence > 0.0 && !w.text.trim().is_empty())
            .collect();
        if kept.is_empty() {
            return RecognitionResult::empty();
        }

        let raw_text = kept
            .iter()
            .map(|w| w.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        let mean = kept.iter().map(|w| w.confidence as f64).sum::<f64>() / kept.len() as f64;
        let text = self.normalizer.normalize(&raw_text);

        debug!(
            "Recognized {} words: raw={:?} text={:?}",
            kept.len(),
            raw_text,
            text
        );

        RecognitionResult {
            text,
            confidence: (mean / 100.0).clamp(0.0, 1.0),
            raw_text,
            word_count: kept.len(),
        }
    }
}
