// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health checks stay responsive while a prediction is running

use super::support::*;
use axum::http::StatusCode;
use image::RgbImage;
use roadsign_node::config::ServiceConfig;
use roadsign_node::vision::{DetectionCandidate, DetectionError, ObjectDetector};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tower::util::ServiceExt; // for `oneshot`

/// Holds the calling thread inside `detect` until released
struct GatedDetector {
    started: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl ObjectDetector for GatedDetector {
    fn detect(
        &self,
        _image: &RgbImage,
        _confidence_min: f32,
        _overlap_max: f32,
    ) -> Result<Vec<DetectionCandidate>, DetectionError> {
        if let Some(started) = self.started.lock().unwrap().take() {
            let _ = started.send(());
        }
        let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(10));
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

// A single runtime thread: detection running inline would starve /health
#[tokio::test(flavor = "current_thread")]
async fn test_health_answers_during_slow_prediction() {
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let detector = GatedDetector {
        started: Mutex::new(Some(started_tx)),
        release: Mutex::new(release_rx),
    };
    let app = app_with(Some(Arc::new(detector)), true, ServiceConfig::default());

    let prediction = tokio::spawn(
        app.clone()
            .oneshot(multipart_request("/predict", vec![Part::png("file")])),
    );
    tokio::time::timeout(Duration::from_secs(5), started_rx)
        .await
        .expect("prediction never reached the detector")
        .unwrap();

    let health = tokio::time::timeout(Duration::from_secs(1), app.oneshot(get_request("/health")))
        .await
        .expect("/health stalled behind the running prediction")
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert!(!prediction.is_finished());

    release_tx.send(()).unwrap();
    let response = prediction.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["detections_count"], 0);
}
