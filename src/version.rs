// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the road sign prediction node

/// Semantic version reported by the HTTP surface
pub const VERSION_NUMBER: &str = "1.0.0";

/// Version stamped into every frame result
pub const PIPELINE_VERSION: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-13";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!(
        "Road Sign Node {} (pipeline {}, {})",
        VERSION_NUMBER, PIPELINE_VERSION, BUILD_DATE
    )
}
