//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::{ModelSlot, SharedState};
use crop_recommend::RangePolicy;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub range_checks: bool,
    pub uptime_seconds: u64,
    pub version: String,
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let predictor = state.model.predictor();
    let detail = match &state.model {
        ModelSlot::Unavailable { reason } => Some(reason.clone()),
        ModelSlot::Loaded(_) => None,
    };

    Json(HealthResponse {
        status: if predictor.is_some() { "healthy" } else { "degraded" }.to_string(),
        model_loaded: predictor.is_some(),
        model_kind: predictor.map(|p| p.kind().to_string()),
        detail,
        range_checks: state.config.range_policy == RangePolicy::Enforce,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
