// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounding boxes and the geometric acceptance policy

use serde::{Deserialize, Serialize};

/// Axis-aligned box in full-image pixel coordinates
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Width, may be zero or negative for malformed boxes
    pub fn width(&self) -> i64 {
        self.x2.saturating_sub(self.x1)
    }

    /// Height, may be zero or negative for malformed boxes
    pub fn height(&self) -> i64 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> i64 {
        self.width().saturating_mul(self.height())
    }

    /// Gate a detector box before any expensive downstream work
    ///
    /// `image_shape` is `(height, width)`. Returns false when a coordinate
    /// falls outside `[0, width] x [0, height]`, when the box is empty or
    /// inverted, when the area is below `min_area`, or when width / height
    /// exceeds `max_aspect_ratio`.
    pub fn is_valid(&self, image_shape: (u32, u32), min_area: i64, max_aspect_ratio: f32) -> bool {
        let (height, width) = (image_shape.0 as i64, image_shape.1 as i64);

        if self.x1 < 0 || self.y1 < 0 || self.x2 > width || self.y2 > height {
            return false;
        }
        if self.x1 >= self.x2 || self.y1 >= self.y2 {
            return false;
        }
        if self.area() < min_area {
            return false;
        }

        // height is strictly positive past the inversion check
        let aspect = self.width() as f64 / self.height() as f64;
        aspect <= max_aspect_ratio as f64
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from(v: [i64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}
