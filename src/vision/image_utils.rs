// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading and the canonical image buffer
//!
//! Every accepted input form is converted to an 8-bit RGB buffer before any
//! pipeline stage sees it.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Failed to read image file {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("Image data is empty")]
    EmptyData,

    #[error("Image has no pixels ({0}x{1})")]
    EmptyImage(u32, u32),
}

/// The three accepted image forms
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Image file on the local filesystem
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...)
    Bytes(Vec<u8>),
    /// Already decoded image
    Decoded(DynamicImage),
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        ImageInput::Decoded(image)
    }
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format, `None` for already decoded input
    pub format: Option<ImageFormat>,
    /// Encoded size in bytes, 0 for already decoded input
    pub size_bytes: usize,
}

/// Decode any accepted input into the canonical RGB buffer
///
/// Encoded inputs (bytes or file contents) larger than `max_bytes` are
/// rejected before decoding.
pub fn decode_input(input: &ImageInput, max_bytes: usize) -> Result<(RgbImage, ImageInfo), ImageError> {
    let (image, info) = match input {
        ImageInput::Path(path) => {
            let bytes = std::fs::read(path).map_err(|e| ImageError::ReadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            decode_image_bytes(&bytes, max_bytes)?
        }
        ImageInput::Bytes(bytes) => decode_image_bytes(bytes, max_bytes)?,
        ImageInput::Decoded(image) => {
            let info = ImageInfo {
                width: image.width(),
                height: image.height(),
                format: None,
                size_bytes: 0,
            };
            (image.clone(), info)
        }
    };

    if info.width == 0 || info.height == 0 {
        return Err(ImageError::EmptyImage(info.width, info.height));
    }

    Ok((image.to_rgb8(), info))
}

/// Decode raw image bytes (for multipart uploads)
///
/// # Arguments
/// * `bytes` - Raw image bytes
/// * `max_bytes` - Largest accepted payload
///
/// # Returns
/// * `Ok((DynamicImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If decoding fails
pub fn decode_image_bytes(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(DynamicImage, ImageInfo), ImageError> {
    // Validate size
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format: Some(format),
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Detect image format from magic bytes
///
/// # Arguments
/// * `bytes` - Raw image data
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(ImageError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}
