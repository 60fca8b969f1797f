//! Inference Predictor Module
//!
//! [`CropPredictor`] is built once (from an artifact directory or an
//! in-memory classifier) and is immutable afterwards, so a single instance can
//! be shared by any number of concurrent requests.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::TOP_K;
use crate::features::{validate_value, FeatureVector, RangePolicy};
use crate::model::{argmax, load_classifier, ArtifactManifest, Classifier, ModelKind};
use crate::utils::error::{CropError, Result};

/// A label with its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub label: String,
    pub probability: f64,
}

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Recommended crop
    pub prediction: String,

    /// Probability of the recommended crop; absent when the classifier
    /// cannot produce probabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Most probable crops, highest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_k: Vec<RankedLabel>,

    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl PredictionResult {
    fn new(
        prediction: String,
        confidence: Option<f64>,
        proba: Option<&[f64]>,
        labels: &[String],
        elapsed: Duration,
    ) -> Self {
        let top_k = proba
            .map(|proba| top_k(proba, labels, TOP_K))
            .unwrap_or_default();

        Self {
            prediction,
            confidence,
            top_k,
            inference_time_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// The `k` most probable labels; equal probabilities keep id order
fn top_k(proba: &[f64], labels: &[String], k: usize) -> Vec<RankedLabel> {
    let mut ranked: Vec<RankedLabel> = labels
        .iter()
        .zip(proba.iter())
        .map(|(label, &probability)| RankedLabel {
            label: label.clone(),
            probability,
        })
        .collect();
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    ranked.truncate(k);
    ranked
}

/// Immutable prediction context
pub struct CropPredictor {
    classifier: Box<dyn Classifier>,
    manifest: Option<ArtifactManifest>,
    range_policy: RangePolicy,
}

impl CropPredictor {
    /// Load from an artifact directory. Any failure is reported as
    /// [`CropError::ModelUnavailable`].
    pub fn load(dir: &Path, range_policy: RangePolicy) -> Result<Self> {
        let (classifier, manifest) = load_classifier(dir).map_err(|e| {
            warn!("Failed to load artifacts from {:?}: {}", dir, e);
            CropError::ModelUnavailable(format!("{:?}: {}", dir, e))
        })?;

        Ok(Self {
            classifier,
            manifest: Some(manifest),
            range_policy,
        })
    }

    /// Wrap an in-memory classifier
    pub fn from_classifier(classifier: Box<dyn Classifier>, range_policy: RangePolicy) -> Self {
        Self {
            classifier,
            manifest: None,
            range_policy,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.classifier.kind()
    }

    pub fn labels(&self) -> &[String] {
        self.classifier.label_map().labels()
    }

    /// Manifest of the loaded artifact, if loaded from disk
    pub fn manifest(&self) -> Option<&ArtifactManifest> {
        self.manifest.as_ref()
    }

    pub fn range_policy(&self) -> RangePolicy {
        self.range_policy
    }

    /// Validate a raw JSON payload, then predict.
    ///
    /// The classifier is never invoked when validation fails.
    pub fn predict_json(&self, raw: &Value) -> Result<PredictionResult> {
        let vector = validate_value(raw, self.range_policy)?;
        self.predict(&vector)
    }

    /// Predict for an already validated feature vector.
    ///
    /// When the classifier yields probabilities the label is their argmax and
    /// the confidence is its probability.
    pub fn predict(&self, vector: &FeatureVector) -> Result<PredictionResult> {
        let start = Instant::now();

        let proba = self
            .classifier
            .predict_proba(vector)
            .map_err(as_prediction_error)?;

        let best = proba
            .as_deref()
            .and_then(|p| argmax(p).map(|id| (id, p[id])));
        let (prediction, confidence) = match best {
            Some((id, probability)) => {
                let label = self
                    .classifier
                    .label_map()
                    .decode(id)
                    .map_err(as_prediction_error)?;
                (label.to_string(), Some(probability))
            }
            None => (
                self.classifier.predict(vector).map_err(as_prediction_error)?,
                None,
            ),
        };

        let result = PredictionResult::new(
            prediction,
            confidence,
            proba.as_deref(),
            self.labels(),
            start.elapsed(),
        );
        debug!(
            "Predicted {} ({:?}) in {:.3}ms",
            result.prediction, result.confidence, result.inference_time_ms
        );
        Ok(result)
    }
}

impl std::fmt::Debug for CropPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CropPredictor")
            .field("kind", &self.kind())
            .field("num_labels", &self.labels().len())
            .field("range_policy", &self.range_policy)
            .finish()
    }
}

fn as_prediction_error(error: CropError) -> CropError {
    match error {
        CropError::Prediction(_) => error,
        other => CropError::Prediction(other.to_string()),
    }
}
