//! Upload gate - extracts the single `image` file from a multipart form

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::StatusCode,
};

use crate::error::NO_FILE_MESSAGE;
use crate::{AppError, AppState};

/// Form field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Room for multipart boundaries and part headers on top of the file ceiling
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// An uploaded image, buffered in memory for one request
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

#[axum::async_trait]
impl FromRequest<AppState> for UploadedImage {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limit = state.config.max_upload_bytes;

        let mut multipart = Multipart::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!("Not a multipart upload: {}", rejection);
            AppError::BadRequest(NO_FILE_MESSAGE.to_string())
        })?;

        let mut image: Option<UploadedImage> = None;

        while let Some(mut field) = multipart.next_field().await.map_err(|e| transport_error(e, limit))? {
            let name = field.name().unwrap_or_default().to_string();

            // Plain text fields never count as files
            let Some(file_name) = field.file_name().map(str::to_owned) else {
                continue;
            };

            if name != IMAGE_FIELD {
                return Err(AppError::BadRequest(format!("Unexpected file field '{}'.", name)));
            }
            if image.is_some() {
                return Err(AppError::BadRequest("Only one image file may be uploaded.".to_string()));
            }

            let content_type = field.content_type().map(str::to_owned);
            let mut buf = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(|e| transport_error(e, limit))? {
                if buf.len() + chunk.len() > limit {
                    tracing::warn!("Rejecting upload '{}': larger than {} bytes", file_name, limit);
                    return Err(AppError::PayloadTooLarge(limit));
                }
                buf.extend_from_slice(&chunk);
            }

            tracing::debug!("Received '{}' ({} bytes, {:?})", file_name, buf.len(), content_type);

            image = Some(UploadedImage {
                bytes: Bytes::from(buf),
                content_type,
                file_name: Some(file_name),
            });
        }

        image.ok_or_else(|| AppError::BadRequest(NO_FILE_MESSAGE.to_string()))
    }
}

fn transport_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::UploadFailed(err.body_text())
    }
}
