//! Classification pipeline
//!
//! ```text
//! bytes ──decode──▶ (h, w, 3) ──resize──▶ (224, 224, 3) ──batch──▶ (1, 224, 224, 3)
//!                                                                        │
//!                                    Verdict ◀──threshold── [0][0] ◀── infer
//! ```

pub mod decision;
pub mod preprocess;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use ndarray::IxDyn;

use crate::inference::{InferenceError, Model, ModelSlot};

pub use decision::{Diagnosis, Verdict};

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("model output has no value at [0][0] (shape {0:?})")]
    MissingScore(Vec<usize>),

    #[error("model output {0} is not a probability")]
    ProbabilityOutOfRange(f32),

    #[error("inference did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("inference task aborted: {0}")]
    Aborted(String),
}

/// Run the full pipeline synchronously
pub fn classify(model: &dyn Model, bytes: &[u8]) -> Result<Verdict, PredictionError> {
    let input = preprocess::to_model_input(bytes)?;
    let output = model.infer(input)?;

    let probability = output
        .get(IxDyn(&[0, 0]))
        .copied()
        .ok_or_else(|| PredictionError::MissingScore(output.shape().to_vec()))?;

    Verdict::from_probability(probability)
}

/// Run the pipeline on the blocking pool, bounded by `limit`.
///
/// Waiting for a free worker counts against the same deadline. The worker
/// permit moves into the blocking task, so a run that outlives its caller
/// keeps its worker busy until it really ends.
pub async fn classify_with_timeout(
    slot: &ModelSlot,
    model: Arc<dyn Model>,
    bytes: Bytes,
    limit: Duration,
) -> Result<Verdict, PredictionError> {
    let started = Instant::now();
    let deadline = tokio::time::Instant::now() + limit;

    let permit = match tokio::time::timeout_at(deadline, slot.acquire_worker()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(closed)) => return Err(PredictionError::Aborted(closed.to_string())),
        Err(_) => {
            tracing::warn!("No inference worker became free within {:?}", limit);
            return Err(PredictionError::TimedOut(limit));
        }
    };

    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        classify(model.as_ref(), &bytes)
    });

    let verdict = match tokio::time::timeout_at(deadline, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => return Err(PredictionError::Aborted(join_err.to_string())),
        Err(_) => return Err(PredictionError::TimedOut(limit)),
    };

    let elapsed = started.elapsed();
    slot.record_latency(elapsed);
    tracing::debug!(
        "Classified as {:?} (p={:.4}) in {:?}",
        verdict.diagnosis,
        verdict.probability,
        elapsed
    );

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use ndarray::{Array4, ArrayD};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::preprocess::tests::encode;

    /// Returns a fixed output tensor and remembers the input shape it saw
    struct ScriptedModel {
        output: ArrayD<f32>,
        seen: Mutex<Vec<Vec<usize>>>,
    }

    impl ScriptedModel {
        fn scalar(p: f32) -> Self {
            Self::with_output(ArrayD::from_elem(IxDyn(&[1, 1]), p))
        }

        fn with_output(output: ArrayD<f32>) -> Self {
            Self { output, seen: Mutex::new(Vec::new()) }
        }
    }

    impl Model for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn infer(&self, input: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
            self.seen.lock().push(input.shape().to_vec());
            Ok(self.output.clone())
        }
    }

    struct SlowModel {
        delay: Duration,
        started: AtomicUsize,
    }

    impl SlowModel {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self { delay, started: AtomicUsize::new(0) })
        }
    }

    impl Model for SlowModel {
        fn name(&self) -> &str {
            "slow"
        }

        fn infer(&self, _input: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(ArrayD::from_elem(IxDyn(&[1, 1]), 0.9))
        }
    }

    struct FailingModel;

    impl Model for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        fn infer(&self, _input: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
            Err(InferenceError::Run("kernel exploded".to_string()))
        }
    }

    struct PanickingModel;

    impl Model for PanickingModel {
        fn name(&self) -> &str {
            "panicking"
        }

        fn infer(&self, _input: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
            panic!("runtime crashed");
        }
    }

    fn sample_jpeg(w: u32, h: u32) -> Vec<u8> {
        encode(&RgbImage::from_pixel(w, h, Rgb([180, 120, 90])), ImageFormat::Jpeg)
    }

    #[test]
    fn test_model_sees_fixed_input_shape() {
        let model = ScriptedModel::scalar(0.2);
        classify(&model, &sample_jpeg(300, 120)).unwrap();
        classify(&model, &sample_jpeg(64, 512)).unwrap();

        let seen = model.seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|s| s == &vec![1, 224, 224, 3]));
    }

    #[test]
    fn test_reads_first_score() {
        let output = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.8, 0.1]).unwrap();
        let verdict = classify(&ScriptedModel::with_output(output), &sample_jpeg(10, 10)).unwrap();

        assert_eq!(verdict.diagnosis, Diagnosis::Cancer);
        assert_eq!(verdict.probability, 0.8);
    }

    #[test]
    fn test_rank_one_output_is_rejected() {
        let output = ArrayD::from_elem(IxDyn(&[1]), 0.8);
        let result = classify(&ScriptedModel::with_output(output), &sample_jpeg(10, 10));
        assert!(matches!(result, Err(PredictionError::MissingScore(_))));
    }

    #[test]
    fn test_decode_failure_skips_inference() {
        let model = ScriptedModel::scalar(0.9);
        let result = classify(&model, b"GIF89a but not really");

        assert!(matches!(result, Err(PredictionError::Decode(_))));
        assert!(model.seen.lock().is_empty());
    }

    #[test]
    fn test_inference_failure_is_prediction_error() {
        let result = classify(&FailingModel, &sample_jpeg(10, 10));
        assert!(matches!(result, Err(PredictionError::Inference(_))));
    }

    #[tokio::test]
    async fn test_timeout_bounds_inference() {
        let slot = ModelSlot::new();
        let model: Arc<dyn Model> = SlowModel::new(Duration::from_millis(500));

        let result = classify_with_timeout(
            &slot,
            model,
            Bytes::from(sample_jpeg(8, 8)),
            Duration::from_millis(20),
        )
        .await;

        assert!(matches!(result, Err(PredictionError::TimedOut(_))));
        assert_eq!(slot.status().inference_count, 0);
    }

    #[tokio::test]
    async fn test_stuck_run_keeps_its_worker() {
        let slot = ModelSlot::with_workers(1);
        let model = SlowModel::new(Duration::from_millis(300));
        let bytes = Bytes::from(sample_jpeg(8, 8));

        let first = classify_with_timeout(&slot, model.clone(), bytes.clone(), Duration::from_millis(20)).await;
        assert!(matches!(first, Err(PredictionError::TimedOut(_))));
        assert_eq!(slot.idle_workers(), 0);

        // Second caller times out waiting for the worker; no new run starts
        let second = classify_with_timeout(&slot, model.clone(), bytes, Duration::from_millis(20)).await;
        assert!(matches!(second, Err(PredictionError::TimedOut(_))));
        assert_eq!(model.started.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(slot.idle_workers(), 1);
    }

    #[tokio::test]
    async fn test_panicking_model_is_aborted() {
        let slot = ModelSlot::with_workers(1);
        let model: Arc<dyn Model> = Arc::new(PanickingModel);

        let result = classify_with_timeout(
            &slot,
            model,
            Bytes::from(sample_jpeg(8, 8)),
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(PredictionError::Aborted(_))));
        assert_eq!(slot.idle_workers(), 1);
    }

    #[tokio::test]
    async fn test_successful_run_records_latency() {
        let slot = ModelSlot::new();
        let model: Arc<dyn Model> = Arc::new(ScriptedModel::scalar(0.3));

        let verdict = classify_with_timeout(
            &slot,
            model,
            Bytes::from(sample_jpeg(8, 8)),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(verdict.diagnosis, Diagnosis::NonCancer);
        assert_eq!(slot.status().inference_count, 1);
    }
}
