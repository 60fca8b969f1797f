//! Z-score normalization parameters
//!
//! Means and population standard deviations (denominator `n`) per feature,
//! stored as `{"mean": [...], "std": [...]}` in canonical feature order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::{Feature, FeatureVector, NUM_FEATURES};
use crate::utils::error::{CropError, Result, ResultExt};

/// Minimum rows for a meaningful standard deviation
const MIN_ROWS: usize = 2;

/// Per-feature mean and standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl NormalizationParams {
    /// Fit means and population standard deviations over training rows
    pub fn fit(rows: &[FeatureVector]) -> Result<Self> {
        if rows.len() < MIN_ROWS {
            return Err(CropError::InsufficientData {
                rows: rows.len(),
                required: MIN_ROWS,
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; NUM_FEATURES];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.as_slice()) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut std = vec![0.0; NUM_FEATURES];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row.as_slice()).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        std.iter_mut().for_each(|s| *s = (*s / n).sqrt());

        Ok(Self { mean, std })
    }

    /// Standardise a vector: `(x - mean) / std`.
    ///
    /// A column with zero standard deviation is rejected rather than
    /// producing NaN or infinity.
    pub fn apply(&self, vector: &FeatureVector) -> Result<[f64; NUM_FEATURES]> {
        let mut out = [0.0; NUM_FEATURES];
        for feature in Feature::ALL {
            let i = feature.index();
            if self.std[i] == 0.0 {
                return Err(CropError::DivisionByZero {
                    field: feature.name().to_string(),
                });
            }
            out[i] = (vector.get(feature) - self.mean[i]) / self.std[i];
        }
        Ok(out)
    }

    /// Inverse transform: `z * std + mean`
    pub fn invert(&self, normalized: &[f64; NUM_FEATURES]) -> FeatureVector {
        let mut values = [0.0; NUM_FEATURES];
        for (i, value) in values.iter_mut().enumerate() {
            *value = normalized[i] * self.std[i] + self.mean[i];
        }
        FeatureVector::new(values)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read normalization parameters {:?}", path))?;
        let params: Self = serde_json::from_str(&content)?;

        if params.mean.len() != NUM_FEATURES || params.std.len() != NUM_FEATURES {
            return Err(CropError::Serialization(format!(
                "Normalization parameters must have {} entries, got mean={} std={}",
                NUM_FEATURES,
                params.mean.len(),
                params.std.len()
            )));
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<FeatureVector> {
        vec![
            FeatureVector::new([90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9]),
            FeatureVector::new([85.0, 58.0, 41.0, 21.7, 80.3, 7.0, 226.6]),
            FeatureVector::new([60.0, 55.0, 44.0, 23.0, 82.3, 7.8, 263.9]),
            FeatureVector::new([40.0, 72.0, 77.0, 17.0, 16.9, 7.4, 88.5]),
        ]
    }

    #[test]
    fn test_fit_uses_population_std() {
        let data = vec![
            FeatureVector::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            FeatureVector::new([3.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0]),
        ];
        let params = NormalizationParams::fit(&data).unwrap();
        assert_eq!(params.mean[0], 2.0);
        // population std of {1, 3} is 1, sample std would be sqrt(2)
        assert!((params.std[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_requires_two_rows() {
        let one = vec![rows()[0]];
        assert!(matches!(
            NormalizationParams::fit(&one),
            Err(CropError::InsufficientData { rows: 1, required: 2 })
        ));
        assert!(NormalizationParams::fit(&[]).is_err());
    }

    #[test]
    fn test_normalized_training_rows_have_zero_mean() {
        let data = rows();
        let params = NormalizationParams::fit(&data).unwrap();

        let mut sums = [0.0; NUM_FEATURES];
        for row in &data {
            let z = params.apply(row).unwrap();
            for (s, v) in sums.iter_mut().zip(z.iter()) {
                *s += v;
            }
        }
        assert!(sums.iter().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn test_round_trip() {
        let params = NormalizationParams::fit(&rows()).unwrap();
        let original = FeatureVector::new([55.5, 12.0, 99.0, 31.2, 45.0, 5.1, 140.0]);

        let restored = params.invert(&params.apply(&original).unwrap());
        for (a, b) in original.as_slice().iter().zip(restored.as_slice()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_column_rejected() {
        let mut data = rows();
        for row in data.iter_mut() {
            let mut values = *row.as_array();
            values[5] = 7.0;
            *row = FeatureVector::new(values);
        }
        let params = NormalizationParams::fit(&data).unwrap();
        assert_eq!(params.std[5], 0.0);

        match params.apply(&data[0]) {
            Err(CropError::DivisionByZero { field }) => assert_eq!(field, "ph"),
            other => panic!("expected DivisionByZero, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normalization.json");

        let params = NormalizationParams::fit(&rows()).unwrap();
        params.save(&path).unwrap();

        let loaded = NormalizationParams::load(&path).unwrap();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_load_rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normalization.json");
        std::fs::write(&path, r#"{"mean": [1.0, 2.0], "std": [1.0, 1.0]}"#).unwrap();

        assert!(matches!(
            NormalizationParams::load(&path),
            Err(CropError::Serialization(_))
        ));
    }
}
