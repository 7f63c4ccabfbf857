//! Asclepius - skin lesion classification backend
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          ASCLEPIUS                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /predict                                               │
//! │    readiness gate ─▶ upload gate ─▶ pipeline ─▶ assembler ───┼──▶ JSON
//! │         │                              │            │        │
//! │    ┌────▼─────┐                  ┌─────▼─────┐  ┌───▼──────┐ │
//! │    │ModelSlot │─────────────────▶│ ONNX model│  │ Document │ │
//! │    └──────────┘                  └───────────┘  │  Store   │ │
//! │  GET /predict/histories ───────────────────────▶└──────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use crate::config::Config;
use crate::inference::ModelSlot;
use crate::middleware::upload::MULTIPART_OVERHEAD_BYTES;
use crate::store::DocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: ModelSlot,
    pub store: Arc<dyn DocumentStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(model: ModelSlot, store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self { model, store, config }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    // Prediction (model must be loaded). The readiness gate wraps only the
    // POST handler so other methods get a 405 envelope whatever the model state.
    let predict_routes = Router::new()
        .route(
            "/predict",
            post(handlers::predict::predict)
                .fallback(handlers::method_not_allowed)
                .route_layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::readiness::require_model_ready,
                )),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    // Always available
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route(
            "/predict/histories",
            get(handlers::predict::histories).fallback(handlers::method_not_allowed),
        );

    Router::new()
        .merge(predict_routes)
        .merge(public_routes)
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
