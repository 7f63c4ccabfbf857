//! Prediction handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::middleware::readiness::ReadyModel;
use crate::middleware::upload::UploadedImage;
use crate::models::{Envelope, HistoryEntry, PredictionRecord};
use crate::pipeline;
use crate::{AppResult, AppState};

/// Classify an uploaded image and store the result
pub async fn predict(
    State(state): State<AppState>,
    ReadyModel(model): ReadyModel,
    image: UploadedImage,
) -> AppResult<(StatusCode, Json<Envelope<PredictionRecord>>)> {
    let verdict = pipeline::classify_with_timeout(
        &state.model,
        model,
        image.bytes,
        state.config.inference_timeout,
    )
    .await?;

    let record = PredictionRecord::assemble(&verdict);
    record
        .save(
            state.store.as_ref(),
            &state.config.predictions_collection,
            state.config.store_timeout,
        )
        .await?;

    tracing::info!("Prediction {} stored: {:?}", record.id, record.result);

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success("Model is predicted successfully", record)),
    ))
}

/// List stored predictions, newest first. An empty history is an empty list.
pub async fn histories(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<HistoryEntry>>>> {
    let records = PredictionRecord::list(
        state.store.as_ref(),
        &state.config.predictions_collection,
        state.config.store_timeout,
    )
    .await?;

    Ok(Json(Envelope::data(
        records.into_iter().map(HistoryEntry::from).collect(),
    )))
}
