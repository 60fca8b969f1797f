//! Crop Dataset Loader
//!
//! Reads the labeled CSV corpus into [`CropSample`]s. Columns are matched by
//! header name, so the file's column order does not matter; the feature vector
//! is always assembled in canonical order.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::features::{Feature, FeatureVector};
use crate::utils::error::{CropError, Result};

/// One labeled example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropSample {
    pub features: FeatureVector,
    pub label: String,
}

/// Raw CSV row, matched by header name
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "N")]
    nitrogen: f64,
    #[serde(rename = "P")]
    phosphorus: f64,
    #[serde(rename = "K")]
    potassium: f64,
    temperature: f64,
    humidity: f64,
    ph: f64,
    rainfall: f64,
    label: String,
}

impl From<CsvRow> for CropSample {
    fn from(row: CsvRow) -> Self {
        Self {
            features: FeatureVector::new([
                row.nitrogen,
                row.phosphorus,
                row.potassium,
                row.temperature,
                row.humidity,
                row.ph,
                row.rainfall,
            ]),
            label: row.label,
        }
    }
}

/// Labeled crop dataset held in memory
#[derive(Debug, Clone, Default)]
pub struct CropDataset {
    pub samples: Vec<CropSample>,
}

impl CropDataset {
    pub fn new(samples: Vec<CropSample>) -> Self {
        Self { samples }
    }

    /// Load a dataset from a CSV file
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading crop dataset from: {:?}", path);

        if !path.exists() {
            return Err(CropError::Dataset(format!(
                "Dataset file does not exist: {:?}",
                path
            )));
        }

        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;

        let stats = dataset.stats();
        info!(
            "Loaded {} samples across {} crops",
            stats.total_samples, stats.num_classes
        );
        Ok(dataset)
    }

    /// Parse CSV content from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        for (row_idx, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let row = record.map_err(|e| {
                CropError::Dataset(format!("Malformed row {}: {}", row_idx + 1, e))
            })?;
            if row.label.is_empty() {
                return Err(CropError::Dataset(format!(
                    "Row {} has an empty label",
                    row_idx + 1
                )));
            }
            let sample = CropSample::from(row);
            if let Some(feature) = Feature::ALL
                .iter()
                .find(|f| !sample.features.get(**f).is_finite())
            {
                return Err(CropError::Dataset(format!(
                    "Row {}: {} is not finite",
                    row_idx + 1,
                    feature.name()
                )));
            }
            samples.push(sample);
        }

        if samples.len() < 2 {
            return Err(CropError::Dataset(format!(
                "Dataset needs at least 2 rows, found {}",
                samples.len()
            )));
        }

        debug!("Parsed {} CSV rows", samples.len());
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Feature vectors in sample order
    pub fn features(&self) -> Vec<FeatureVector> {
        self.samples.iter().map(|s| s.features).collect()
    }

    /// Labels in sample order
    pub fn labels(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.label.clone()).collect()
    }

    /// Per-crop sample counts
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = BTreeMap::new();
        for sample in &self.samples {
            *class_counts.entry(sample.label.clone()).or_insert(0) += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: class_counts.len(),
            class_counts,
        }
    }
}

/// Dataset summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;

    const SAMPLE_CSV: &str = "\
N,P,K,temperature,humidity,ph,rainfall,label
90,42,43,20.87974371,82.00274423,6.502985292,202.9355362,rice
85,58,41,21.77046169,80.31964408,7.038096361,226.6555374,rice
71,54,16,22.61359953,63.69070564,5.749914421,87.75953857,maize
40,72,77,17.02498456,16.98861173,7.485996067,88.55123143,chickpea
";

    #[test]
    fn test_parse_csv() {
        let dataset = CropDataset::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.samples[0].label, "rice");
        assert_eq!(dataset.samples[0].features.get(Feature::Nitrogen), 90.0);
        assert!((dataset.samples[3].features.get(Feature::Ph) - 7.485996067).abs() < 1e-12);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "\
label,rainfall,ph,humidity,temperature,K,P,N,extra
rice,202.9,6.5,82.0,20.8,43,42,90,ignored
maize,87.7,5.7,63.6,22.6,16,54,71,ignored
";
        let dataset = CropDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            dataset.samples[0].features.as_array(),
            &[90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9]
        );
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let csv = "N,P,K,temperature,humidity,rainfall,label\n1,2,3,4,5,6,rice\n1,2,3,4,5,6,rice\n";
        assert!(matches!(
            CropDataset::from_reader(csv.as_bytes()),
            Err(CropError::Dataset(_))
        ));
    }

    #[test]
    fn test_malformed_value_is_fatal() {
        let csv = "N,P,K,temperature,humidity,ph,rainfall,label\n1,2,3,4,5,six,7,rice\n1,2,3,4,5,6,7,rice\n";
        let err = CropDataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_non_finite_value_is_fatal() {
        for cell in ["NaN", "inf", "-inf"] {
            let csv = format!(
                "N,P,K,temperature,humidity,ph,rainfall,label\n\
                 90,42,43,20.8,82.0,6.5,202.9,rice\n\
                 90,42,43,20.8,82.0,{},202.9,rice\n",
                cell
            );
            match CropDataset::from_reader(csv.as_bytes()) {
                Err(CropError::Dataset(message)) => {
                    assert!(message.contains("Row 2"), "{}", message);
                    assert!(message.contains("ph"), "{}", message);
                }
                other => panic!("{} accepted: {:?}", cell, other),
            }
        }
    }

    #[test]
    fn test_too_few_rows() {
        let csv = "N,P,K,temperature,humidity,ph,rainfall,label\n1,2,3,4,5,6,7,rice\n";
        assert!(CropDataset::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CropDataset::from_csv_path("/nonexistent/crops.csv"),
            Err(CropError::Dataset(_))
        ));
    }

    #[test]
    fn test_stats() {
        let stats = CropDataset::from_reader(SAMPLE_CSV.as_bytes())
            .unwrap()
            .stats();
        assert_eq!(stats.total_samples, 4);
        assert_eq!(stats.num_classes, 3);
        assert_eq!(stats.class_counts["rice"], 2);
    }
}
