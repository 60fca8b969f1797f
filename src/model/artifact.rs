//! Artifact directory format
//!
//! A training run leaves one directory holding everything serving needs:
//!
//! ```text
//! manifest.json        schema version, feature order, model kind, run id
//! labels.txt           label list, id order
//! forest.json          random forest only
//! network.mpk          network only (Burn CompactRecorder)
//! network_config.json  network only
//! normalization.json   network only
//! config.json          training config (informational)
//! metrics.json         training report (informational)
//! ```
//!
//! Loading asserts that the manifest's feature schema matches the one compiled
//! into this crate before any classifier file is read.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{Classifier, ModelKind, NeuralClassifier, RandomForest};
use crate::features::{FEATURE_NAMES, FEATURE_SCHEMA_VERSION};
use crate::preprocessing::LabelMap;
use crate::utils::error::{CropError, Result, ResultExt};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const LABELS_FILE: &str = "labels.txt";
pub const CONFIG_FILE: &str = "config.json";
pub const METRICS_FILE: &str = "metrics.json";

/// Description of a trained artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub schema_version: u32,
    pub feature_names: Vec<String>,
    pub model_kind: ModelKind,
    pub num_classes: usize,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub crate_version: String,
}

impl ArtifactManifest {
    /// Manifest for a classifier trained with the current feature schema
    pub fn new(model_kind: ModelKind, num_classes: usize, run_id: Uuid) -> Self {
        Self {
            schema_version: FEATURE_SCHEMA_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            model_kind,
            num_classes,
            run_id,
            created_at: Utc::now(),
            crate_version: crate::VERSION.to_string(),
        }
    }

    /// Fail unless the artifact was produced for this crate's feature schema
    pub fn check_schema(&self) -> Result<()> {
        if self.schema_version != FEATURE_SCHEMA_VERSION {
            return Err(CropError::SchemaMismatch(format!(
                "artifact schema version {} != {}",
                self.schema_version, FEATURE_SCHEMA_VERSION
            )));
        }
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) {
            return Err(CropError::SchemaMismatch(format!(
                "artifact features {:?} != {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        Ok(())
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Write a classifier, its label list and manifest into `dir`
pub fn write_artifacts(
    dir: &Path,
    classifier: &dyn Classifier,
    run_id: Uuid,
) -> Result<ArtifactManifest> {
    std::fs::create_dir_all(dir)?;

    classifier.save(dir)?;
    classifier.label_map().save(&dir.join(LABELS_FILE))?;

    let manifest = ArtifactManifest::new(classifier.kind(), classifier.label_map().len(), run_id);
    manifest.save(dir)?;

    info!(
        "Saved {} artifacts to {:?} (run {})",
        manifest.model_kind, dir, manifest.run_id
    );
    Ok(manifest)
}

/// Load a classifier from an artifact directory
pub fn load_classifier(dir: &Path) -> Result<(Box<dyn Classifier>, ArtifactManifest)> {
    let manifest = ArtifactManifest::load(dir)?;
    manifest.check_schema()?;

    let labels = LabelMap::load(&dir.join(LABELS_FILE))?;
    if labels.len() != manifest.num_classes {
        return Err(CropError::Serialization(format!(
            "Manifest declares {} classes but label list has {}",
            manifest.num_classes,
            labels.len()
        )));
    }

    let classifier: Box<dyn Classifier> = match manifest.model_kind {
        ModelKind::RandomForest => Box::new(RandomForest::load(dir, labels)?),
        ModelKind::NeuralNetwork => Box::new(NeuralClassifier::load(dir, labels)?),
    };

    info!(
        "Loaded {} classifier with {} classes from {:?}",
        manifest.model_kind, manifest.num_classes, dir
    );
    Ok((classifier, manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_dataset;
    use crate::model::ForestConfig;

    fn forest() -> RandomForest {
        let config = ForestConfig {
            n_trees: 5,
            ..Default::default()
        };
        RandomForest::fit(&synthetic_dataset(10), &config).unwrap()
    }

    #[test]
    fn test_manifest_uses_current_schema() {
        let manifest = ArtifactManifest::new(ModelKind::RandomForest, 22, Uuid::new_v4());
        assert_eq!(manifest.feature_names, FEATURE_NAMES);
        assert!(manifest.check_schema().is_ok());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let forest = forest();
        let manifest = write_artifacts(dir.path(), &forest, Uuid::new_v4()).unwrap();

        assert!(dir.path().join(MANIFEST_FILE).exists());
        assert!(dir.path().join(LABELS_FILE).exists());

        let (loaded, loaded_manifest) = load_classifier(dir.path()).unwrap();
        assert_eq!(loaded_manifest, manifest);
        assert_eq!(loaded.kind(), ModelKind::RandomForest);
        assert_eq!(loaded.label_map(), forest.label_map());
    }

    #[test]
    fn test_foreign_feature_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = write_artifacts(dir.path(), &forest(), Uuid::new_v4()).unwrap();

        manifest.feature_names.swap(0, 1);
        manifest.save(dir.path()).unwrap();

        assert!(matches!(
            load_classifier(dir.path()),
            Err(CropError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_schema_version_mismatch_rejected() {
        let mut manifest = ArtifactManifest::new(ModelKind::RandomForest, 3, Uuid::new_v4());
        manifest.schema_version += 1;
        assert!(matches!(manifest.check_schema(), Err(CropError::SchemaMismatch(_))));
    }

    #[test]
    fn test_missing_directory() {
        assert!(load_classifier(Path::new("/nonexistent/artifacts")).is_err());
    }
}
