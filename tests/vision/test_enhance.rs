// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Legibility enhancement of cropped regions

use image::{GrayImage, Luma, Rgb, RgbImage};
use roadsign_node::config::{EnhanceConfig, ThresholdMethod};
use roadsign_node::vision::enhance::{correct_brightness, mean_intensity, upscale_to_min_height};
use roadsign_node::vision::LegibilityEnhancer;

/// White sign with a dark horizontal bar across the middle
fn sign_crop(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |_, y| {
        if y >= height / 3 && y < 2 * height / 3 {
            Rgb([20, 20, 20])
        } else {
            Rgb([230, 230, 230])
        }
    })
}

#[test]
fn test_small_crop_is_upscaled_to_min_height() {
    let enhancer = LegibilityEnhancer::new(EnhanceConfig::default());
    let out = enhancer.enhance(&sign_crop(40, 16));
    assert_eq!(out.height(), 32);
    assert_eq!(out.width(), 80);
}

#[test]
fn test_tall_crop_keeps_its_size() {
    let enhancer = LegibilityEnhancer::new(EnhanceConfig::default());
    let out = enhancer.enhance(&sign_crop(60, 48));
    assert_eq!(out.dimensions(), (60, 48));
}

#[test]
fn test_binarized_output_is_two_level() {
    for method in [ThresholdMethod::Adaptive, ThresholdMethod::Otsu] {
        let enhancer = LegibilityEnhancer::new(EnhanceConfig {
            threshold_method: method,
            ..EnhanceConfig::default()
        });
        let out = enhancer.enhance(&sign_crop(64, 48));
        assert!(
            out.pixels().all(|p| p[0] == 0 || p[0] == 255),
            "{:?} left grey levels",
            method
        );
    }
}

#[test]
fn test_empty_crop_passes_through() {
    let enhancer = LegibilityEnhancer::new(EnhanceConfig::default());
    let out = enhancer.enhance(&RgbImage::new(0, 0));
    assert_eq!(out.dimensions(), (0, 0));
}

#[test]
fn test_dark_crop_is_brightened() {
    let dark = GrayImage::from_pixel(8, 8, Luma([50]));
    let out = correct_brightness(&dark);
    // 1.2 * 50 + 30
    assert_eq!(out.get_pixel(0, 0)[0], 90);
    assert!(mean_intensity(&out) > mean_intensity(&dark));
}

#[test]
fn test_bright_crop_is_untouched() {
    let bright = GrayImage::from_pixel(8, 8, Luma([150]));
    assert_eq!(correct_brightness(&bright), bright);
}

#[test]
fn test_upscale_keeps_aspect_ratio() {
    let gray = GrayImage::from_pixel(30, 10, Luma([128]));
    let out = upscale_to_min_height(&gray, 32);
    assert_eq!(out.dimensions(), (96, 32));
}
