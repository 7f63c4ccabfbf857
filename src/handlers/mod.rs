//! HTTP handlers

pub mod health;
pub mod predict;

use axum::http::{Method, Uri};

use crate::AppError;

/// Envelope-shaped 404 for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {} not found", uri.path()))
}

/// Envelope-shaped 405 for known routes hit with the wrong method
pub async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!("Method {} not allowed on {}", method, uri.path()))
}
