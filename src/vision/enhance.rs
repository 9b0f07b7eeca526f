// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Legibility enhancement for cropped sign regions
//!
//! Steps run in a fixed order, each one toggled by [`EnhanceConfig`]:
//! 1. Convert to a single intensity channel
//! 2. Denoise (3x3 median)
//! 3. Local contrast equalization (CLAHE, clip 2.0, 8x8 tiles)
//! 4. Brightness correction for dark crops
//! 5. Cubic upscale of short crops to `min_height`
//! 6. Binarization (adaptive Gaussian or global Otsu)

use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use tracing::trace;

use crate::config::{EnhanceConfig, ThresholdMethod};

/// Mean intensity below which a crop is brightened
pub const DARK_MEAN_THRESHOLD: f64 = 100.0;
/// Linear gain applied to dark crops
pub const BRIGHTNESS_GAIN: f32 = 1.2;
/// Offset applied to dark crops
pub const BRIGHTNESS_OFFSET: f32 = 30.0;

const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_GRID: u32 = 8;

/// Gaussian sigma matching an 11x11 adaptive block
const ADAPTIVE_SIGMA: f32 = 2.0;
/// Constant subtracted from the local weighted mean
const ADAPTIVE_OFFSET: f32 = 2.0;

/// Turns a color crop into a binarized buffer for the text engine
#[derive(Debug, Clone)]
pub struct LegibilityEnhancer {
    config: EnhanceConfig,
}

impl LegibilityEnhancer {
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }

    pub fn enhance(&self, roi: &RgbImage) -> GrayImage {
        let mut gray = to_intensity(roi);
        if gray.width() == 0 || gray.height() == 0 {
            return gray;
        }

        if self.config.denoise {
            gray = denoise(&gray);
        }
        if self.config.contrast_enhancement {
            gray = equalize_local_contrast(&gray);
        }
        if self.config.brightness_adjustment {
            gray = correct_brightness(&gray);
        }
        gray = upscale_to_min_height(&gray, self.config.min_height);

        let out = binarize(&gray, self.config.threshold_method);
        trace!(
            "Enhanced ROI {}x{} -> {}x{}",
            roi.width(),
            roi.height(),
            out.width(),
            out.height()
        );
        out
    }
}

/// ITU-R 601 luma conversion
pub fn to_intensity(roi: &RgbImage) -> GrayImage {
    imageops::grayscale(roi)
}

pub fn denoise(gray: &GrayImage) -> GrayImage {
    median_filter(gray, 1, 1)
}

pub fn mean_intensity(gray: &GrayImage) -> f64 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / count as f64
}

/// Brighten crops whose mean intensity is below [`DARK_MEAN_THRESHOLD`]
pub fn correct_brightness(gray: &GrayImage) -> GrayImage {
    if mean_intensity(gray) >= DARK_MEAN_THRESHOLD {
        return gray.clone();
    }
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        let v = BRIGHTNESS_GAIN * p[0] as f32 + BRIGHTNESS_OFFSET;
        p[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Scale up so the height reaches `min_height`, keeping the aspect ratio
pub fn upscale_to_min_height(gray: &GrayImage, min_height: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if h == 0 || h >= min_height {
        return gray.clone();
    }
    let scale = min_height as f64 / h as f64;
    let new_w = ((w as f64 * scale) as u32).max(1);
    imageops::resize(gray, new_w, min_height, imageops::FilterType::CatmullRom)
}

pub fn binarize(gray: &GrayImage, method: ThresholdMethod) -> GrayImage {
    match method {
        ThresholdMethod::Adaptive => adaptive_gaussian_threshold(gray),
        ThresholdMethod::Otsu => threshold(gray, otsu_level(gray), ThresholdType::Binary),
        ThresholdMethod::None => gray.clone(),
    }
}

/// Foreground where a pixel is brighter than its Gaussian-weighted
/// neighbourhood mean minus a small offset
pub fn adaptive_gaussian_threshold(gray: &GrayImage) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, ADAPTIVE_SIGMA);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0] as f32;
        let t = local_mean.get_pixel(x, y)[0] as f32 - ADAPTIVE_OFFSET;
        if v > t {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Contrast-limited adaptive histogram equalization
pub fn equalize_local_contrast(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let tiles_x = CLAHE_GRID.min(w);
    let tiles_y = CLAHE_GRID.min(h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, x1) = (tx * w / tiles_x, (tx + 1) * w / tiles_x);
            let (y0, y1) = (ty * h / tiles_y, (ty + 1) * h / tiles_y);
            luts[(ty * tiles_x + tx) as usize] = tile_lut(gray, x0, x1, y0, y1);
        }
    }

    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;
    let mut out = GrayImage::new(w, h);

    for y in 0..h {
        let (ty0, ty1, wy) = neighbour_tiles(y, tile_h, tiles_y);
        for x in 0..w {
            let (tx0, tx1, wx) = neighbour_tiles(x, tile_w, tiles_x);
            let v = gray.get_pixel(x, y)[0] as usize;
            let at = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;

            let top = at(tx0, ty0) * (1.0 - wx) + at(tx1, ty0) * wx;
            let bottom = at(tx0, ty1) * (1.0 - wx) + at(tx1, ty1) * wx;
            let value = top * (1.0 - wy) + bottom * wy;
            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// The two tile indices bracketing `pos` and the weight of the second one
fn neighbour_tiles(pos: u32, tile_size: f32, tiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile_size - 0.5;
    let last = (tiles - 1) as f32;
    let first = f.floor().clamp(0.0, last);
    let second = (first + 1.0).min(last);
    let weight = if second > first {
        (f - first).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (first as u32, second as u32, weight)
}

fn tile_lut(gray: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    let limit = ((CLAHE_CLIP_LIMIT * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let bonus = excess / 256;
    let residual = excess % 256;
    for (k, bin) in hist.iter_mut().enumerate() {
        *bin += bonus + u32::from((k as u32) < residual);
    }

    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (k, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[k] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}
