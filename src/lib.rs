//! # Crop Recommendation
//!
//! A Rust library that recommends a crop from seven soil and weather
//! measurements (N, P, K, temperature, humidity, pH, rainfall).
//!
//! ## Features
//!
//! - **Fixed feature schema** shared by training and serving, versioned in every artifact
//! - **Two classifiers** behind one trait: a bagged random forest (`linfa-trees`)
//!   and a small MLP trained with the **Burn** framework
//! - **Reproducible training** with seeded splits and per-tree seeds
//! - **Immutable predictor** that can be shared by concurrent request handlers
//!
//! ## Modules
//!
//! - `features`: Feature schema and raw input validation
//! - `preprocessing`: Normalization parameters and the label map
//! - `dataset`: CSV loading and train/test splitting
//! - `model`: Classifier trait, random forest, MLP and artifact format
//! - `training`: Training configuration, Burn training loop and pipeline
//! - `inference`: The prediction service context
//! - `utils`: Logging, metrics, and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crop_recommend::training::{run, TrainingConfig};
//! use crop_recommend::{CropPredictor, RangePolicy};
//!
//! let report = run(&TrainingConfig::default())?;
//! println!("{}", report.display());
//!
//! let predictor = CropPredictor::load(&report.output_dir, RangePolicy::Enforce)?;
//! let result = predictor.predict_json(&serde_json::json!({
//!     "N": 90, "P": 42, "K": 43, "temperature": 20.8,
//!     "humidity": 82.0, "ph": 6.5, "rainfall": 202.9
//! }))?;
//! ```

pub mod backend;
pub mod dataset;
pub mod features;
pub mod inference;
pub mod model;
pub mod preprocessing;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{CropDataset, CropSample};
pub use features::{validate, validate_value, Feature, FeatureVector, RangePolicy, FEATURE_NAMES};
pub use inference::{CropPredictor, PredictionResult};
pub use model::{load_classifier, Classifier, ModelKind, NeuralClassifier, RandomForest};
pub use preprocessing::{LabelMap, NormalizationParams};
pub use training::{TrainingConfig, TrainingReport};
pub use utils::error::{CropError, Result};
pub use utils::metrics::{ConfusionMatrix, Metrics};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
