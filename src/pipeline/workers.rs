// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounded pool for blocking model and OCR calls

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker pool is closed")]
    Closed,

    #[error("Blocking task panicked: {0}")]
    Panicked(String),

    #[error("Blocking task was cancelled")]
    Cancelled,
}

/// Runs closures on the blocking thread pool, at most `size` at a time
///
/// Cheap to clone; clones share the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running task
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit, then run `f` off the async executor
    pub async fn run<F, T>(&self, f: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        });

        handle.await.map_err(|e| {
            if e.is_panic() {
                WorkerError::Panicked(panic_message(e.into_panic()))
            } else {
                WorkerError::Cancelled
            }
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
