// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Padded crop extraction

use image::{Rgb, RgbImage};
use roadsign_node::vision::roi::{extract, padded_region};
use roadsign_node::vision::BoundingBox;

/// Pixel channels encode their own coordinates
fn coordinate_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
}

#[test]
fn test_padding_expands_both_axes() {
    let region = padded_region(&BoundingBox::new(50, 20, 150, 80), (200, 100), 0.1);
    assert_eq!(region, BoundingBox::new(40, 14, 160, 86));
}

#[test]
fn test_crop_starts_at_padded_origin() {
    let image = coordinate_image(200, 100);
    let crop = extract(&image, &BoundingBox::new(50, 20, 150, 80), 0.1);
    assert_eq!(crop.dimensions(), (120, 72));
    assert_eq!(crop.get_pixel(0, 0), &Rgb([40, 14, 0]));
}

#[test]
fn test_zero_padding_is_exact_crop() {
    let image = coordinate_image(200, 100);
    let crop = extract(&image, &BoundingBox::new(10, 5, 30, 25), 0.0);
    assert_eq!(crop.dimensions(), (20, 20));
    assert_eq!(crop.get_pixel(19, 19), &Rgb([29, 24, 0]));
}

#[test]
fn test_over_expansion_clamps_to_frame() {
    let image = coordinate_image(100, 100);
    let crop = extract(&image, &BoundingBox::new(0, 0, 50, 50), 0.5);
    assert_eq!(crop.dimensions(), (75, 75));

    let crop = extract(&image, &BoundingBox::new(10, 10, 90, 90), 2.0);
    assert_eq!(crop.dimensions(), (100, 100));
}

#[test]
fn test_box_outside_frame_yields_empty_crop() {
    let image = coordinate_image(200, 100);
    let crop = extract(&image, &BoundingBox::new(300, 0, 400, 50), 0.1);
    assert_eq!(crop.width() as u64 * crop.height() as u64, 0);
}

#[test]
fn test_padded_region_contains_original_box() {
    let bbox = BoundingBox::new(30, 40, 90, 70);
    for ratio in [0.0_f32, 0.05, 0.1, 0.25, 1.0] {
        let region = padded_region(&bbox, (120, 80), ratio);
        assert!(region.x1 <= bbox.x1 && region.y1 <= bbox.y1, "ratio {}", ratio);
        assert!(region.x2 >= bbox.x2 && region.y2 >= bbox.y2, "ratio {}", ratio);
    }
}
