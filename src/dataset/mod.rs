//! Dataset module for the crop recommendation corpus
//!
//! This module provides functionality for:
//! - Loading the labeled CSV dataset into typed samples
//! - Reproducible train/test splitting with a fixed seed
//!
//! ## Expected format
//!
//! A header row containing at least `N,P,K,temperature,humidity,ph,rainfall,label`
//! (any order, extra columns ignored), then one labeled example per row.

pub mod loader;
pub mod split;

pub use loader::{CropDataset, CropSample, DatasetStats};
pub use split::{train_test_split, SplitConfig, TrainTestSplit};

/// Default location of the dataset, relative to the working directory
pub const DEFAULT_DATASET_PATH: &str = "dataset/Crop_recommendation.csv";

/// Three well-separated crops: rice is wet, chickpea is dry, maize in between
#[cfg(test)]
pub(crate) fn synthetic_dataset(per_class: usize) -> CropDataset {
    use crate::features::FeatureVector;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut samples = Vec::new();
    for _ in 0..per_class {
        let jitter = |rng: &mut ChaCha8Rng| rng.gen_range(-1.0..1.0f64);
        samples.push(CropSample {
            features: FeatureVector::new([
                80.0 + 5.0 * jitter(&mut rng),
                45.0 + 5.0 * jitter(&mut rng),
                40.0 + 3.0 * jitter(&mut rng),
                23.0 + 2.0 * jitter(&mut rng),
                82.0 + 2.0 * jitter(&mut rng),
                6.4 + 0.3 * jitter(&mut rng),
                230.0 + 20.0 * jitter(&mut rng),
            ]),
            label: "rice".to_string(),
        });
        samples.push(CropSample {
            features: FeatureVector::new([
                40.0 + 5.0 * jitter(&mut rng),
                68.0 + 5.0 * jitter(&mut rng),
                80.0 + 3.0 * jitter(&mut rng),
                18.0 + 2.0 * jitter(&mut rng),
                16.0 + 2.0 * jitter(&mut rng),
                7.3 + 0.3 * jitter(&mut rng),
                80.0 + 10.0 * jitter(&mut rng),
            ]),
            label: "chickpea".to_string(),
        });
        samples.push(CropSample {
            features: FeatureVector::new([
                78.0 + 5.0 * jitter(&mut rng),
                48.0 + 5.0 * jitter(&mut rng),
                20.0 + 3.0 * jitter(&mut rng),
                22.0 + 2.0 * jitter(&mut rng),
                65.0 + 2.0 * jitter(&mut rng),
                6.2 + 0.3 * jitter(&mut rng),
                85.0 + 10.0 * jitter(&mut rng),
            ]),
            label: "maize".to_string(),
        });
    }
    CropDataset::new(samples)
}

