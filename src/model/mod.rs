//! Model module: the classifier capability and its two variants
//!
//! This module provides:
//! - The [`Classifier`] trait shared by training, evaluation and serving
//! - A bagged random forest built on `linfa-trees`
//! - A small multi-layer perceptron trained with Burn and served from exported weights
//! - The artifact directory format that ties a trained classifier to the feature schema
//!
//! Both variants consume [`FeatureVector`]s in canonical order and return crop
//! labels from a [`LabelMap`] fixed at training time.

pub mod artifact;
pub mod config;
pub mod forest;
pub mod mlp;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::CropDataset;
use crate::features::{FeatureVector, NUM_FEATURES};
use crate::preprocessing::LabelMap;
use crate::training::TrainingConfig;
use crate::utils::error::{CropError, Result};

pub use artifact::{load_classifier, ArtifactManifest};
pub use config::{ForestConfig, MlpConfig};
pub use forest::RandomForest;
pub use mlp::{CropMlp, CropMlpConfig, NeuralClassifier};

/// Which classifier variant an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "forest")]
    RandomForest,
    #[serde(rename = "mlp")]
    NeuralNetwork,
}

impl ModelKind {
    /// Short name used on the command line and in manifests
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "forest",
            ModelKind::NeuralNetwork => "mlp",
        }
    }

    /// Fit this variant on a training partition.
    ///
    /// `holdout` is only used for per-epoch progress reporting by the network.
    pub fn train(
        self,
        train: &CropDataset,
        holdout: Option<&CropDataset>,
        config: &TrainingConfig,
    ) -> Result<Box<dyn Classifier>> {
        match self {
            ModelKind::RandomForest => Ok(Box::new(RandomForest::fit(train, &config.forest)?)),
            ModelKind::NeuralNetwork => Ok(Box::new(crate::training::trainer::train_network(
                train,
                holdout,
                &config.mlp,
            )?)),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "forest" | "random_forest" | "rf" => Ok(ModelKind::RandomForest),
            "mlp" | "nn" | "neural" => Ok(ModelKind::NeuralNetwork),
            other => Err(CropError::Config(format!("Unknown model kind: {}", other))),
        }
    }
}

/// A trained crop classifier.
///
/// Implementations are immutable after training and shared across threads,
/// so every method takes `&self`.
pub trait Classifier: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Label space fixed at training time
    fn label_map(&self) -> &LabelMap;

    /// Predicted class id
    fn predict_id(&self, vector: &FeatureVector) -> Result<usize>;

    /// Predicted crop label
    fn predict(&self, vector: &FeatureVector) -> Result<String> {
        let id = self.predict_id(vector)?;
        self.label_map()
            .decode(id)
            .map(str::to_string)
            .map_err(|e| CropError::Prediction(e.to_string()))
    }

    /// Class probability distribution indexed by class id, when supported
    fn predict_proba(&self, _vector: &FeatureVector) -> Result<Option<Vec<f64>>> {
        Ok(None)
    }

    /// Relative importance of each feature in canonical order, when supported
    fn feature_importances(&self) -> Option<[f64; NUM_FEATURES]> {
        None
    }

    fn predict_batch(&self, vectors: &[FeatureVector]) -> Result<Vec<usize>> {
        vectors.iter().map(|v| self.predict_id(v)).collect()
    }

    /// Write the variant-specific artifact files into `dir`
    fn save(&self, dir: &Path) -> Result<()>;
}

/// Index of the largest value; the lowest index wins ties
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
