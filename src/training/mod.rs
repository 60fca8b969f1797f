//! Training module
//!
//! This module provides:
//! - [`TrainingConfig`]: everything a training run needs, with serde defaults
//! - [`trainer`]: the Burn training loop for the neural network
//! - [`pipeline`]: load, split, fit, evaluate and persist in one batch run

pub mod pipeline;
pub mod trainer;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::{SplitConfig, DEFAULT_DATASET_PATH};
use crate::model::{ForestConfig, MlpConfig, ModelKind};
use crate::utils::error::{CropError, Result, ResultExt};

pub use pipeline::{run, ImportanceEntry, TrainingReport};
pub use trainer::train_network;

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Labeled CSV dataset
    pub data_path: PathBuf,

    /// Artifact directory to write
    pub output_dir: PathBuf,

    /// Classifier variant to fit
    pub model: ModelKind,

    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,

    /// Seed for the train/test shuffle
    pub seed: u64,

    pub forest: ForestConfig,
    pub mlp: MlpConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATASET_PATH),
            output_dir: PathBuf::from("artifacts/forest"),
            model: ModelKind::RandomForest,
            test_fraction: 0.2,
            seed: 42,
            forest: ForestConfig::default(),
            mlp: MlpConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Default configuration for a given variant, writing to `artifacts/<kind>`
    pub fn for_model(model: ModelKind) -> Self {
        Self {
            model,
            output_dir: PathBuf::from("artifacts").join(model.as_str()),
            ..Default::default()
        }
    }

    pub fn split(&self) -> SplitConfig {
        SplitConfig {
            test_fraction: self.test_fraction,
            seed: self.seed,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.split().validate()?;
        match self.model {
            ModelKind::RandomForest => self.forest.validate(),
            ModelKind::NeuralNetwork => self.mlp.validate(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training config {:?}", path))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CropError::Config(format!("Invalid training config {:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.model, ModelKind::RandomForest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_model_sets_output_dir() {
        let config = TrainingConfig::for_model(ModelKind::NeuralNetwork);
        assert_eq!(config.output_dir, PathBuf::from("artifacts/mlp"));
    }

    #[test]
    fn test_validation() {
        let mut config = TrainingConfig::default();
        config.test_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = TrainingConfig::for_model(ModelKind::NeuralNetwork);
        config.mlp.epochs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = TrainingConfig::for_model(ModelKind::NeuralNetwork);
        config.mlp.epochs = 7;
        config.save(&path).unwrap();

        let loaded = TrainingConfig::load(&path).unwrap();
        assert_eq!(loaded.model, ModelKind::NeuralNetwork);
        assert_eq!(loaded.mlp.epochs, 7);
    }

    #[test]
    fn test_partial_json() {
        let config: TrainingConfig = serde_json::from_str(r#"{"model": "mlp", "seed": 3}"#).unwrap();
        assert_eq!(config.model, ModelKind::NeuralNetwork);
        assert_eq!(config.seed, 3);
        assert_eq!(config.forest.n_trees, 100);
    }
}
