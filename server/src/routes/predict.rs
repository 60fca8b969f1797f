//! Prediction endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use super::error::ApiError;
use crate::state::SharedState;
use crop_recommend::CropError;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// POST /predict - Recommend a crop for one set of measurements
///
/// Model availability is checked before the body is looked at.
pub async fn predict(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let predictor = state.model.predictor().ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Model not loaded. Train a model and restart the server.",
        )
    })?;

    let Json(raw) = payload.map_err(|rejection| {
        debug!("Rejected request body: {}", rejection.body_text());
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("{}: {}", CropError::EmptyInput, rejection.body_text()),
        )
    })?;

    let result = predictor.predict_json(&raw).map_err(|e| {
        if !e.is_validation() {
            error!("Prediction failed: {}", e);
        }
        ApiError::from(e)
    })?;

    Ok(Json(PredictResponse {
        prediction: result.prediction,
        confidence: result.confidence,
    }))
}
