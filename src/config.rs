//! Configuration module

use std::env;
use std::time::Duration;

use crate::inference::DEFAULT_INFERENCE_WORKERS;

/// Default Upload Gate ceiling in bytes
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1_000_000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Location of the ONNX model (http(s) URL or filesystem path)
    pub model_url: String,

    /// Database connection URL. `None` keeps history in memory.
    pub database_url: Option<String>,

    /// Collection holding prediction records
    pub predictions_collection: String,

    /// Maximum accepted image size
    pub max_upload_bytes: usize,

    /// Upper bound for a single inference
    pub inference_timeout: Duration,

    /// Inferences allowed to run at once
    pub inference_workers: usize,

    /// Upper bound for a single document-store call
    pub store_timeout: Duration,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),

            model_url: lookup("MODEL_URL")
                .unwrap_or_else(|| "./model/model.onnx".to_string()),

            database_url: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty()),

            predictions_collection: lookup("PREDICTIONS_COLLECTION")
                .unwrap_or_else(|| "predictions".to_string()),

            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|b| b.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),

            inference_timeout: lookup("INFERENCE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(30)),

            inference_workers: lookup("INFERENCE_WORKERS")
                .and_then(|n| n.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(DEFAULT_INFERENCE_WORKERS),

            store_timeout: lookup("STORE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(10)),

            environment: lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
