//! Inference module - model abstraction and readiness slot
//!
//! The model is loaded once at boot by a background task and published
//! through a [`ModelSlot`]. Until the slot is filled every prediction
//! request is turned away by the readiness gate.

pub mod onnx;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ndarray::{Array4, ArrayD};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

pub use onnx::OnnxModel;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("failed to fetch model: {0}")]
    Fetch(String),

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Run(String),
}

/// A loaded graph model that maps an input tensor to an output tensor.
///
/// Implementations must be safe to call from many requests at once.
pub trait Model: Send + Sync {
    /// Human readable model name for logs and the health endpoint
    fn name(&self) -> &str;

    /// Run the model on an NHWC batch
    fn infer(&self, input: Array4<f32>) -> Result<ArrayD<f32>, InferenceError>;
}

struct LoadedModel {
    model: Arc<dyn Model>,
    loaded_at: DateTime<Utc>,
}

#[derive(Default)]
struct InferenceStats {
    count: AtomicU64,
    latency_sum_us: AtomicU64,
}

/// Default number of inferences allowed in flight at once
pub const DEFAULT_INFERENCE_WORKERS: usize = 4;

/// Set-once handle to the process model, shared through `AppState`.
///
/// The slot also owns the worker permits: a permit is held for as long as
/// an inference actually runs, including after its caller gave up waiting.
#[derive(Clone)]
pub struct ModelSlot {
    loaded: Arc<OnceCell<LoadedModel>>,
    stats: Arc<InferenceStats>,
    workers: Arc<Semaphore>,
    capacity: usize,
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::with_workers(DEFAULT_INFERENCE_WORKERS)
    }
}

/// Model state for the health endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub loaded: bool,
    pub name: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
    pub busy_workers: usize,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot allowing at most `workers` concurrent inferences (at least one)
    pub fn with_workers(workers: usize) -> Self {
        let capacity = workers.max(1);
        Self {
            loaded: Arc::new(OnceCell::new()),
            stats: Arc::new(InferenceStats::default()),
            workers: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Publish the loaded model. Returns `false` if a model was already installed.
    pub fn install(&self, model: Arc<dyn Model>) -> bool {
        let name = model.name().to_string();
        let installed = self
            .loaded
            .set(LoadedModel {
                model,
                loaded_at: Utc::now(),
            })
            .is_ok();

        if installed {
            tracing::info!("Model ready: {}", name);
        } else {
            tracing::warn!("Ignoring second model install ({}); models are never reloaded", name);
        }
        installed
    }

    pub fn get(&self) -> Option<Arc<dyn Model>> {
        self.loaded.get().map(|l| Arc::clone(&l.model))
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Wait for a free inference worker
    pub async fn acquire_worker(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.workers).acquire_owned().await
    }

    pub fn idle_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// Record one completed inference
    pub fn record_latency(&self, elapsed: Duration) {
        self.stats
            .latency_sum_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.stats.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn status(&self) -> ModelStatus {
        let sum = self.stats.latency_sum_us.load(Ordering::Relaxed);
        let count = self.stats.count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        let loaded = self.loaded.get();
        ModelStatus {
            loaded: loaded.is_some(),
            name: loaded.map(|l| l.model.name().to_string()),
            loaded_at: loaded.map(|l| l.loaded_at),
            inference_count: count,
            avg_latency_ms: avg,
            busy_workers: self.capacity - self.idle_workers(),
        }
    }
}
