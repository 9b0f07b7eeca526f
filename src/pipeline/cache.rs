// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounded LRU cache of successful frame results keyed by content fingerprint

use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::result::FrameSuccess;
use crate::vision::ImageInput;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// SHA-256 fingerprint of an image input
///
/// Encoded inputs hash their bytes; decoded images hash their dimensions,
/// color type and raw samples. Unreadable paths have no fingerprint.
pub fn fingerprint(input: &ImageInput) -> Option<String> {
    let mut hasher = Sha256::new();
    match input {
        ImageInput::Bytes(bytes) => {
            hasher.update(b"bytes:");
            hasher.update(bytes);
        }
        ImageInput::Path(path) => {
            let bytes = std::fs::read(path).ok()?;
            hasher.update(b"bytes:");
            hasher.update(&bytes);
        }
        ImageInput::Decoded(image) => {
            hasher.update(b"decoded:");
            hasher.update(image.width().to_le_bytes());
            hasher.update(image.height().to_le_bytes());
            hasher.update(format!("{:?}", image.color()).as_bytes());
            hasher.update(image.as_bytes());
        }
    }
    Some(hex::encode(hasher.finalize()))
}

/// Prediction cache with least-recently-used eviction
#[derive(Clone)]
pub struct PredictionCache {
    entries: Arc<Mutex<LruCache<String, FrameSuccess>>>,
    capacity: NonZeroUsize,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl PredictionCache {
    /// A zero capacity is raised to one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            capacity,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get(&self, key: &str) -> Option<FrameSuccess> {
        let found = self.entries.lock().await.get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub async fn put(&self, key: String, frame: FrameSuccess) {
        self.entries.lock().await.put(key, frame);
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().await.len(),
            capacity: self.capacity.get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
