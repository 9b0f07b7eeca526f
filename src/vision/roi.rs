// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Padded region-of-interest extraction

use image::{imageops, RgbImage};

use super::geometry::BoundingBox;

/// Box actually cropped after padding and clamping, in source coordinates
pub fn padded_region(bbox: &BoundingBox, image_dims: (u32, u32), padding_ratio: f32) -> BoundingBox {
    let (img_w, img_h) = (image_dims.0 as i64, image_dims.1 as i64);
    let ratio = padding_ratio.max(0.0) as f64;

    // truncated toward zero, same as integer pixel padding
    let pad_x = (bbox.width().max(0) as f64 * ratio) as i64;
    let pad_y = (bbox.height().max(0) as f64 * ratio) as i64;

    let x1 = bbox.x1.saturating_sub(pad_x).clamp(0, img_w);
    let y1 = bbox.y1.saturating_sub(pad_y).clamp(0, img_h);
    let x2 = bbox.x2.saturating_add(pad_x).clamp(0, img_w);
    let y2 = bbox.y2.saturating_add(pad_y).clamp(0, img_h);

    BoundingBox::new(x1, y1, x2.max(x1), y2.max(y1))
}

/// Crop `bbox` expanded by `padding_ratio` of its width and height
///
/// Over-expansion is clamped to the image silently. A ratio of 0 gives the
/// exact crop. Boxes lying fully outside the image yield an empty buffer.
pub fn extract(image: &RgbImage, bbox: &BoundingBox, padding_ratio: f32) -> RgbImage {
    let region = padded_region(bbox, image.dimensions(), padding_ratio);
    imageops::crop_imm(
        image,
        region.x1 as u32,
        region.y1 as u32,
        region.width() as u32,
        region.height() as u32,
    )
    .to_image()
}
