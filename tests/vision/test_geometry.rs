// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Geometric acceptance of detector boxes

use roadsign_node::vision::BoundingBox;

/// 640x480 frame, as (height, width)
const FRAME: (u32, u32) = (480, 640);
const MIN_AREA: i64 = 100;
const MAX_ASPECT: f32 = 5.0;

fn accepted(x1: i64, y1: i64, x2: i64, y2: i64) -> bool {
    BoundingBox::new(x1, y1, x2, y2).is_valid(FRAME, MIN_AREA, MAX_ASPECT)
}

#[test]
fn test_typical_sign_box_accepted() {
    assert!(accepted(100, 100, 200, 200));
}

#[test]
fn test_full_frame_box_accepted() {
    // 640 / 480 is well under the aspect limit
    assert!(BoundingBox::new(0, 0, 640, 480).is_valid(FRAME, MIN_AREA, MAX_ASPECT));
}

#[test]
fn test_out_of_bounds_rejected() {
    assert!(!accepted(-1, 10, 50, 50));
    assert!(!accepted(10, -1, 50, 50));
    assert!(!accepted(600, 10, 641, 50));
    assert!(!accepted(10, 400, 50, 481));
}

#[test]
fn test_empty_and_inverted_rejected() {
    assert!(!accepted(50, 50, 50, 80));
    assert!(!accepted(50, 50, 80, 50));
    assert!(!accepted(80, 50, 50, 90));
}

#[test]
fn test_area_boundary() {
    // 10 x 10 = 100 is exactly the minimum
    assert!(accepted(0, 0, 10, 10));
    // 9 x 11 = 99
    assert!(!accepted(0, 0, 9, 11));
}

#[test]
fn test_aspect_boundary() {
    // 50 / 10 = 5.0 is exactly the limit
    assert!(accepted(0, 0, 50, 10));
    assert!(!accepted(0, 0, 51, 10));
    // tall boxes are never rejected for aspect
    assert!(accepted(0, 0, 10, 400));
}

#[test]
fn test_extreme_coordinates_do_not_overflow() {
    assert!(!accepted(i64::MIN, i64::MIN, i64::MAX, i64::MAX));
    assert!(!BoundingBox::new(0, 0, 10, 10).is_valid((0, 0), MIN_AREA, MAX_ASPECT));
}

#[test]
fn test_serializes_as_coordinate_array() {
    let json = serde_json::to_value(BoundingBox::new(1, 2, 3, 4)).unwrap();
    assert_eq!(json, serde_json::json!([1, 2, 3, 4]));
}
