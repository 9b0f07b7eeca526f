// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod predict;
pub mod service;
pub mod stats;

pub use errors::{ApiError, ErrorResponse, ServiceError};
pub use http_server::{create_app, start_server, AppState};
pub use predict::{BatchItemError, BatchItemResponse, PredictResponse};
pub use service::{BatchItemResult, HealthReport, MetricsReport, PredictionService};
pub use stats::{ServiceStatistics, StatisticsSnapshot};
