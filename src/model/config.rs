//! Model Configuration Module
//!
//! Hyperparameters for the two classifier variants.

use serde::{Deserialize, Serialize};

use crate::utils::error::{CropError, Result};

/// Configuration for the random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of bagged trees
    pub n_trees: usize,

    /// Maximum tree depth (`None` grows until leaves are pure)
    pub max_depth: Option<usize>,

    /// Minimum sample weight required to split a node
    pub min_weight_split: f32,

    /// Seed for the bootstrap samples
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_weight_split: 2.0,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(CropError::Config("Forest needs at least one tree".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(CropError::Config("max_depth must be positive".to_string()));
        }
        if !(self.min_weight_split >= 1.0) {
            return Err(CropError::Config(format!(
                "min_weight_split must be >= 1, got {}",
                self.min_weight_split
            )));
        }
        Ok(())
    }
}

/// Training hyperparameters for the neural network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Width of the first hidden layer
    pub hidden1: usize,

    /// Width of the second hidden layer
    pub hidden2: usize,

    /// Number of passes over the training partition
    pub epochs: usize,

    /// Mini-batch size
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Seed for weight init and batch shuffling
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden1: 64,
            hidden2: 32,
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            seed: 42,
        }
    }
}

impl MlpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden1 == 0 || self.hidden2 == 0 {
            return Err(CropError::Config("Hidden layers must be non-empty".to_string()));
        }
        if self.epochs == 0 {
            return Err(CropError::Config("epochs must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(CropError::Config("batch_size must be positive".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(CropError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}
