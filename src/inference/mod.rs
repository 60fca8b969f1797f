//! Inference module for serving crop recommendations
//!
//! This module provides:
//! - [`CropPredictor`]: an immutable context holding a loaded classifier
//! - Field validation followed by prediction on raw JSON payloads
//! - Prediction results with optional confidence and top-k alternatives

pub mod predictor;

pub use predictor::{CropPredictor, PredictionResult, RankedLabel};

/// Number of alternatives reported alongside a prediction
pub const TOP_K: usize = 3;
