//! Readiness middleware - turn requests away until the model is loaded

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::inference::Model;
use crate::{AppError, AppState};

/// The loaded model, placed in request extensions by [`require_model_ready`]
#[derive(Clone)]
pub struct ReadyModel(pub Arc<dyn Model>);

/// Middleware: Require a loaded model, otherwise 503 without reading the body
pub async fn require_model_ready(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let model = state.model.get().ok_or_else(|| {
        tracing::warn!("Rejecting {} {}: model not loaded yet", req.method(), req.uri().path());
        AppError::ServiceUnavailable
    })?;

    req.extensions_mut().insert(ReadyModel(model));

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ReadyModel
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<ReadyModel>()
            .cloned()
            .ok_or(AppError::ServiceUnavailable)
    }
}
