//! Reproducible train/test splitting
//!
//! Samples are shuffled with a `ChaCha8Rng` seeded from the configured seed and
//! the first `ceil(n * test_fraction)` become the held-out test partition. The
//! same dataset and seed always yield the same partitions.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::loader::CropDataset;
use crate::utils::error::{CropError, Result};

/// Configuration for dataset splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of samples held out for evaluation
    pub test_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn new(test_fraction: f64, seed: u64) -> Result<Self> {
        let config = Self {
            test_fraction,
            seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(CropError::Config(format!(
                "Test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    /// Number of held-out samples for a dataset of `n` rows
    pub fn test_size(&self, n: usize) -> usize {
        (n as f64 * self.test_fraction).ceil() as usize
    }
}

/// Training and held-out partitions
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: CropDataset,
    pub test: CropDataset,
}

impl TrainTestSplit {
    pub fn sizes(&self) -> (usize, usize) {
        (self.train.len(), self.test.len())
    }
}

/// Shuffle and split a dataset into train and test partitions
pub fn train_test_split(dataset: &CropDataset, config: &SplitConfig) -> Result<TrainTestSplit> {
    config.validate()?;

    let n = dataset.len();
    let test_size = config.test_size(n);
    if test_size == 0 || test_size >= n {
        return Err(CropError::InsufficientData {
            rows: n,
            required: 2,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(test_size);
    let pick = |idx: &[usize]| {
        CropDataset::new(idx.iter().map(|&i| dataset.samples[i].clone()).collect())
    };

    let split = TrainTestSplit {
        train: pick(train_idx),
        test: pick(test_idx),
    };

    info!(
        "Split {} samples: {} train, {} test (seed {})",
        n,
        split.train.len(),
        split.test.len(),
        config.seed
    );
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CropSample;
    use crate::features::FeatureVector;

    fn create_dataset(n: usize) -> CropDataset {
        CropDataset::new(
            (0..n)
                .map(|i| CropSample {
                    features: FeatureVector::new([i as f64, 0.0, 0.0, 20.0, 50.0, 6.5, 100.0]),
                    label: format!("crop_{}", i % 3),
                })
                .collect(),
        )
    }

    fn ids(dataset: &CropDataset) -> Vec<usize> {
        dataset.samples.iter().map(|s| s.features.as_slice()[0] as usize).collect()
    }

    #[test]
    fn test_default_split_sizes() {
        let split = train_test_split(&create_dataset(100), &SplitConfig::default()).unwrap();
        assert_eq!(split.sizes(), (80, 20));
    }

    #[test]
    fn test_test_size_rounds_up() {
        let split = train_test_split(&create_dataset(11), &SplitConfig::default()).unwrap();
        assert_eq!(split.sizes(), (8, 3));
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover() {
        let split = train_test_split(&create_dataset(50), &SplitConfig::default()).unwrap();
        let mut all: Vec<usize> = ids(&split.train);
        all.extend(ids(&split.test));
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_reproducibility() {
        let dataset = create_dataset(60);
        let config = SplitConfig::default();

        let a = train_test_split(&dataset, &config).unwrap();
        let b = train_test_split(&dataset, &config).unwrap();
        assert_eq!(ids(&a.test), ids(&b.test));
        assert_eq!(ids(&a.train), ids(&b.train));

        let other = train_test_split(&dataset, &SplitConfig::new(0.2, 7).unwrap()).unwrap();
        assert_ne!(ids(&a.test), ids(&other.test));
    }

    #[test]
    fn test_two_rows_split_one_each() {
        let split = train_test_split(&create_dataset(2), &SplitConfig::default()).unwrap();
        assert_eq!(split.sizes(), (1, 1));
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(SplitConfig::new(0.0, 42).is_err());
        assert!(SplitConfig::new(1.0, 42).is_err());
        assert!(SplitConfig::new(f64::NAN, 42).is_err());
    }
}
