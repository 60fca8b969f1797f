//! Application state for the crop recommendation server
//!
//! The predictor is loaded once at startup and never mutated, so handlers
//! share it through an `Arc` without any locking. A failed load leaves the
//! server running in degraded mode.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crop_recommend::{CropPredictor, RangePolicy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Artifact directory produced by a training run
    pub artifacts_dir: PathBuf,
    /// Whether request values are checked against physical ranges
    pub range_policy: RangePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            artifacts_dir: PathBuf::from("artifacts/forest"),
            range_policy: RangePolicy::Enforce,
        }
    }
}

/// The loaded model, or why there is none
pub enum ModelSlot {
    Loaded(CropPredictor),
    Unavailable { reason: String },
}

impl ModelSlot {
    /// Load the predictor named by the configuration
    pub fn load(config: &ServerConfig) -> Self {
        match CropPredictor::load(&config.artifacts_dir, config.range_policy) {
            Ok(predictor) => {
                info!(
                    "Loaded {} model with {} crops from {:?}",
                    predictor.kind(),
                    predictor.labels().len(),
                    config.artifacts_dir
                );
                ModelSlot::Loaded(predictor)
            }
            Err(e) => {
                warn!("Serving without a model: {}", e);
                ModelSlot::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn predictor(&self) -> Option<&CropPredictor> {
        match self {
            ModelSlot::Loaded(predictor) => Some(predictor),
            ModelSlot::Unavailable { .. } => None,
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Model loaded at startup
    pub model: ModelSlot,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    /// Build state, loading the model from the configured artifacts
    pub fn new(config: ServerConfig) -> Self {
        let model = ModelSlot::load(&config);
        Self::with_model(config, model)
    }

    pub fn with_model(config: ServerConfig, model: ModelSlot) -> Self {
        Self {
            config,
            model,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
