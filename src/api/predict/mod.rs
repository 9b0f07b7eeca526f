// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Road sign prediction endpoints
//!
//! POST /predict and POST /predict/batch, multipart image uploads.

pub mod handler;
pub mod response;

pub use handler::{predict_batch_handler, predict_handler, Upload};
pub use response::{BatchItemError, BatchItemResponse, PredictResponse};
