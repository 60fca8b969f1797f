//! Training pipeline: load, split, fit, evaluate, persist
//!
//! A run is a single batch job. Any failure aborts it; the artifact directory
//! is only complete once [`run`] returns `Ok`.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::TrainingConfig;
use crate::dataset::{train_test_split, CropDataset};
use crate::features::{Feature, NUM_FEATURES};
use crate::model::artifact::{self, CONFIG_FILE, METRICS_FILE};
use crate::model::{Classifier, ModelKind};
use crate::utils::error::Result;
use crate::utils::format_duration;
use crate::utils::metrics::Metrics;

/// One row of the feature importance ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceEntry {
    pub feature: String,
    pub importance: f64,
}

/// Summary of a training run, persisted as `metrics.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub run_id: Uuid,
    pub model_kind: ModelKind,
    pub created_at: DateTime<Utc>,
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub train_size: usize,
    pub test_size: usize,
    pub num_classes: usize,
    pub metrics: Metrics,
    /// Descending importance; absent when the classifier does not expose it
    pub feature_importances: Option<Vec<ImportanceEntry>>,
    pub training_seconds: f64,
    pub evaluation_seconds: f64,
}

impl TrainingReport {
    /// Console rendering: accuracy, classification report, importances
    pub fn display(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Model: {} | run {}\n",
            self.model_kind, self.run_id
        ));
        out.push_str(&format!(
            "Samples: {} train / {} test | {} crops\n",
            self.train_size, self.test_size, self.num_classes
        ));
        out.push_str(&format!(
            "Training time: {} | Evaluation time: {}\n\n",
            format_duration(self.training_seconds),
            format_duration(self.evaluation_seconds)
        ));
        out.push_str(&format!(
            "Accuracy: {:.4} ({}/{})\n\n",
            self.metrics.accuracy, self.metrics.correct_predictions, self.metrics.total_samples
        ));
        out.push_str(&self.metrics.classification_report());

        if let Some(importances) = &self.feature_importances {
            out.push_str("\nFeature importance:\n");
            out.push_str(&format!("{:<12} {:>10}\n", "feature", "importance"));
            for entry in importances {
                out.push_str(&format!("{:<12} {:>10.4}\n", entry.feature, entry.importance));
            }
        }
        out
    }
}

/// Rank features by importance, highest first; ties keep canonical order
pub fn rank_importances(importances: &[f64; NUM_FEATURES]) -> Vec<ImportanceEntry> {
    let mut ranked: Vec<ImportanceEntry> = Feature::ALL
        .iter()
        .map(|f| ImportanceEntry {
            feature: f.name().to_string(),
            importance: importances[f.index()],
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Score a classifier against a labeled dataset.
///
/// Samples whose crop is outside the classifier's label space cannot be
/// scored and are skipped with a warning.
pub fn evaluate_classifier(classifier: &dyn Classifier, dataset: &CropDataset) -> Result<Metrics> {
    let labels = classifier.label_map();

    let mut vectors = Vec::with_capacity(dataset.len());
    let mut truth = Vec::with_capacity(dataset.len());
    let mut skipped = 0usize;
    for sample in &dataset.samples {
        match labels.encode(&sample.label) {
            Ok(id) => {
                vectors.push(sample.features);
                truth.push(id);
            }
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {} samples with crops unknown to the classifier", skipped);
    }

    let predictions = classifier.predict_batch(&vectors)?;
    Ok(Metrics::from_predictions(&predictions, &truth, labels.labels()))
}

/// Run a complete training job and write its artifact directory
pub fn run(config: &TrainingConfig) -> Result<TrainingReport> {
    config.validate()?;
    let run_id = Uuid::new_v4();
    info!("Starting {} training run {}", config.model, run_id);

    let dataset = CropDataset::from_csv_path(&config.data_path)?;
    let split = train_test_split(&dataset, &config.split())?;

    let train_start = Instant::now();
    let classifier = config.model.train(&split.train, Some(&split.test), config)?;
    let training_seconds = train_start.elapsed().as_secs_f64();
    info!("Training finished in {}", format_duration(training_seconds));

    let eval_start = Instant::now();
    let metrics = evaluate_classifier(classifier.as_ref(), &split.test)?;
    let evaluation_seconds = eval_start.elapsed().as_secs_f64();
    info!("Held-out accuracy: {:.2}%", metrics.accuracy * 100.0);

    let report = TrainingReport {
        run_id,
        model_kind: classifier.kind(),
        created_at: Utc::now(),
        data_path: config.data_path.clone(),
        output_dir: config.output_dir.clone(),
        train_size: split.train.len(),
        test_size: split.test.len(),
        num_classes: classifier.label_map().len(),
        metrics,
        feature_importances: classifier.feature_importances().map(|i| rank_importances(&i)),
        training_seconds,
        evaluation_seconds,
    };

    artifact::write_artifacts(&config.output_dir, classifier.as_ref(), run_id)?;
    config.save(&config.output_dir.join(CONFIG_FILE))?;
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(config.output_dir.join(METRICS_FILE), json)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_dataset;
    use crate::features::FeatureVector;
    use crate::model::{load_classifier, ForestConfig};
    use crate::utils::error::CropError;

    fn write_csv(dataset: &CropDataset, path: &std::path::Path) {
        let mut csv = String::from("N,P,K,temperature,humidity,ph,rainfall,label\n");
        for sample in &dataset.samples {
            let values: Vec<String> = sample.features.as_slice().iter().map(|v| v.to_string()).collect();
            csv.push_str(&format!("{},{}\n", values.join(","), sample.label));
        }
        std::fs::write(path, csv).unwrap();
    }

    fn forest_config(dir: &std::path::Path) -> TrainingConfig {
        let data_path = dir.join("crops.csv");
        write_csv(&synthetic_dataset(30), &data_path);
        TrainingConfig {
            data_path,
            output_dir: dir.join("artifacts"),
            forest: ForestConfig {
                n_trees: 20,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_importances_descending_with_stable_ties() {
        let ranked = rank_importances(&[0.1, 0.3, 0.1, 0.0, 0.3, 0.2, 0.0]);
        let order: Vec<&str> = ranked.iter().map(|e| e.feature.as_str()).collect();
        assert_eq!(order, ["P", "humidity", "ph", "N", "K", "temperature", "rainfall"]);
    }

    #[test]
    fn test_forest_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = forest_config(dir.path());

        let report = run(&config).unwrap();
        assert_eq!(report.train_size + report.test_size, 90);
        assert_eq!(report.test_size, 18);
        assert!(report.metrics.accuracy > 0.9);
        assert_eq!(report.feature_importances.as_ref().unwrap().len(), NUM_FEATURES);
        assert!(report.display().contains("Accuracy"));

        for file in ["manifest.json", "labels.txt", "forest.json", "config.json", "metrics.json"] {
            assert!(config.output_dir.join(file).exists(), "missing {}", file);
        }

        let (classifier, manifest) = load_classifier(&config.output_dir).unwrap();
        assert_eq!(manifest.run_id, report.run_id);
        let rice = FeatureVector::new([90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9]);
        assert_eq!(classifier.predict(&rice).unwrap(), "rice");
    }

    #[test]
    fn test_reruns_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let config = forest_config(dir.path());

        let a = run(&config).unwrap();
        let b = run(&config).unwrap();
        assert_eq!(a.metrics.accuracy, b.metrics.accuracy);
        assert_eq!(a.feature_importances, b.feature_importances);
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_missing_dataset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainingConfig {
            data_path: dir.path().join("missing.csv"),
            output_dir: dir.path().join("artifacts"),
            ..Default::default()
        };

        assert!(matches!(run(&config), Err(CropError::Dataset(_))));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn test_network_run_writes_network_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = forest_config(dir.path());
        config.model = ModelKind::NeuralNetwork;
        config.mlp.epochs = 30;
        config.mlp.learning_rate = 1e-2;

        let report = run(&config).unwrap();
        assert!(report.feature_importances.is_none());
        for file in ["network.mpk", "network_config.json", "normalization.json"] {
            assert!(config.output_dir.join(file).exists(), "missing {}", file);
        }

        let (classifier, _) = load_classifier(&config.output_dir).unwrap();
        assert_eq!(classifier.kind(), ModelKind::NeuralNetwork);
    }
}
