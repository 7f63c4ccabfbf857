//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};

use crate::models::Failure;
use crate::pipeline::PredictionError;
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

pub const NO_FILE_MESSAGE: &str = "No image file uploaded.";
pub const PREDICTION_FAILED_MESSAGE: &str = "There was an error during the prediction process.";

#[derive(Debug)]
pub enum AppError {
    // Client errors
    BadRequest(String),
    PayloadTooLarge(usize),
    NotFound(String),
    MethodNotAllowed(String),

    // Model not loaded yet
    ServiceUnavailable,

    // Pipeline errors
    Prediction(PredictionError),

    // Document store errors
    Store(StoreError),

    // Upload transport errors
    UploadFailed(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Payload content length greater than maximum allowed: {}", limit),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg),
            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model is not ready yet, please try again later.".to_string(),
            ),
            AppError::Prediction(PredictionError::TimedOut(limit)) => {
                tracing::error!("Prediction timed out after {:?}", limit);
                (StatusCode::GATEWAY_TIMEOUT, "Prediction timed out.".to_string())
            }
            AppError::Prediction(err) => {
                tracing::error!("Prediction error: {}", err);
                (StatusCode::BAD_REQUEST, PREDICTION_FAILED_MESSAGE.to_string())
            }
            AppError::Store(err) => {
                tracing::error!("Store error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to access prediction history.".to_string())
            }
            AppError::UploadFailed(msg) => {
                tracing::error!("Upload error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong during the upload.".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(Failure::new(message))).into_response()
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        match err {
            // A panicked or cancelled worker is our fault, not the upload's
            PredictionError::Aborted(msg) => AppError::InternalError(msg),
            err => AppError::Prediction(err),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}
