//! ONNX Runtime model
//!
//! Loads the exported classifier graph from a URL or a local path and runs
//! it with ONNX Runtime.

use std::path::Path;

use ndarray::{Array4, ArrayD, IxDyn};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::{InferenceError, Model};

pub struct OnnxModel {
    name: String,
    output_name: String,
    // `Session::run` needs exclusive access
    session: Mutex<Session>,
}

impl OnnxModel {
    /// Load the model from an `http(s)://` URL or a filesystem path
    pub async fn load(source: &str) -> Result<Self, InferenceError> {
        if is_remote(source) {
            let bytes = fetch_model(source).await?;
            Self::from_bytes(source, &bytes)
        } else {
            Self::from_file(source)
        }
    }

    /// Load ONNX model from a file
    pub fn from_file(path: &str) -> Result<Self, InferenceError> {
        tracing::info!("Loading ONNX model from: {}", path);

        if !Path::new(path).exists() {
            return Err(InferenceError::Load(format!("Model not found: {}", path)));
        }

        let session = Session::builder()
            .map_err(|e| InferenceError::Load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Load(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| InferenceError::Load(format!("Failed to load model: {}", e)))?;

        Self::from_session(path, session)
    }

    /// Load ONNX model from bytes
    pub fn from_bytes(name: &str, model_bytes: &[u8]) -> Result<Self, InferenceError> {
        tracing::info!("Loading ONNX model from memory ({} bytes)", model_bytes.len());

        let session = Session::builder()
            .map_err(|e| InferenceError::Load(format!("Session builder error: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Load(format!("Optimization error: {}", e)))?
            .commit_from_memory(model_bytes)
            .map_err(|e| InferenceError::Load(format!("Load from memory error: {}", e)))?;

        Self::from_session(name, session)
    }

    fn from_session(name: &str, session: Session) -> Result<Self, InferenceError> {
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::Load("Model defines no outputs".to_string()))?;

        tracing::info!("ONNX model loaded successfully (output: {})", output_name);

        Ok(Self {
            name: name.to_string(),
            output_name,
            session: Mutex::new(session),
        })
    }
}

impl Model for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&self, input: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
        let input_tensor = Value::from_array(input)
            .map_err(|e| InferenceError::Run(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError::Run(format!("Missing output '{}'", self.output_name)))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Run(format!("Extract error: {}", e)))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
            .map_err(|e| InferenceError::Run(format!("Output shape error: {}", e)))
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn fetch_model(url: &str) -> Result<Vec<u8>, InferenceError> {
    tracing::info!("Downloading model from {}", url);

    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| InferenceError::Fetch(e.to_string()))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| InferenceError::Fetch(e.to_string()))?;

    Ok(bytes.to_vec())
}
