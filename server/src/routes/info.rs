//! Service description endpoint

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// GET / - Service name, version and available endpoints
pub async fn service_info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Crop Recommendation API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ["GET /", "GET /health", "POST /predict"]
            .iter()
            .map(|e| e.to_string())
            .collect(),
    })
}
