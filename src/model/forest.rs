//! Random forest classifier
//!
//! A bagged ensemble of CART trees from `linfa-trees`. Each tree sees a
//! bootstrap sample drawn with its own `ChaCha8Rng` seeded from
//! `seed + tree_index`, so the fitted forest does not depend on how rayon
//! schedules the trees.

use std::path::Path;

use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality, TreeNode};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::ForestConfig;
use super::{argmax, Classifier, ModelKind};
use crate::dataset::CropDataset;
use crate::features::{FeatureVector, NUM_FEATURES};
use crate::preprocessing::LabelMap;
use crate::utils::error::{CropError, Result, ResultExt};

/// File name of the serialized forest inside an artifact directory
pub const FOREST_FILE: &str = "forest.json";

/// Bagged decision tree ensemble
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    labels: LabelMap,
    trees: Vec<DecisionTree<f64, usize>>,
    importances: [f64; NUM_FEATURES],
}

/// On-disk form; the label map lives in its own file
#[derive(Serialize, Deserialize)]
struct ForestFile {
    config: ForestConfig,
    importances: [f64; NUM_FEATURES],
    trees: Vec<DecisionTree<f64, usize>>,
}

impl RandomForest {
    /// Fit a forest on a labeled training partition
    pub fn fit(dataset: &CropDataset, config: &ForestConfig) -> Result<Self> {
        config.validate()?;

        let labels = LabelMap::fit(&dataset.labels())?;
        let targets = labels.encode_all(&dataset.labels())?;
        let records = to_records(&dataset.features())?;
        let n = records.nrows();

        info!(
            "Fitting random forest: {} trees, {} samples, {} classes",
            config.n_trees,
            n,
            labels.len()
        );

        let num_classes = labels.len();
        let fitted = (0..config.n_trees)
            .into_par_iter()
            .map(|tree_idx| -> Result<_> {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

                let x = records.select(ndarray::Axis(0), &sample);
                let y: Vec<usize> = sample.iter().map(|&i| targets[i]).collect();

                let tree = DecisionTree::params()
                    .split_quality(SplitQuality::Gini)
                    .max_depth(config.max_depth)
                    .min_weight_split(config.min_weight_split)
                    .fit(&Dataset::new(x.clone(), Array1::from(y.clone())))
                    .map_err(|e| CropError::Training(format!("Tree {} failed: {}", tree_idx, e)))?;

                let importance = gini_importance(&tree, &x, &y, num_classes);
                Ok((tree, importance))
            })
            .collect::<Result<Vec<_>>>()?;

        let (trees, per_tree): (Vec<_>, Vec<_>) = fitted.into_iter().unzip();
        let importances = mean_importances(&per_tree);
        debug!("Forest importances: {:?}", importances);

        Ok(Self {
            config: config.clone(),
            labels,
            trees,
            importances,
        })
    }

    /// Load `forest.json` from an artifact directory
    pub fn load(dir: &Path, labels: LabelMap) -> Result<Self> {
        let path = dir.join(FOREST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read forest {:?}", path))?;
        let file: ForestFile = serde_json::from_str(&content)?;

        if file.trees.is_empty() {
            return Err(CropError::Serialization(format!("Forest {:?} has no trees", path)));
        }

        Ok(Self {
            config: file.config,
            labels,
            trees: file.trees,
            importances: file.importances,
        })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Per-class vote counts for each row of `records`
    fn votes(&self, records: &Array2<f64>) -> Result<Vec<Vec<usize>>> {
        let num_classes = self.labels.len();
        let mut votes = vec![vec![0usize; num_classes]; records.nrows()];

        for tree in &self.trees {
            let predicted = tree.predict(records);
            for (row, &class) in predicted.iter().enumerate() {
                let slot = votes[row].get_mut(class).ok_or_else(|| {
                    CropError::Prediction(format!(
                        "Tree voted for class {} but only {} classes exist",
                        class, num_classes
                    ))
                })?;
                *slot += 1;
            }
        }

        Ok(votes)
    }

    fn winner(votes: &[usize]) -> Result<usize> {
        let counts: Vec<f64> = votes.iter().map(|&v| v as f64).collect();
        argmax(&counts).ok_or_else(|| CropError::Prediction("Forest has no classes".to_string()))
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn label_map(&self) -> &LabelMap {
        &self.labels
    }

    fn predict_id(&self, vector: &FeatureVector) -> Result<usize> {
        let votes = self.votes(&to_records(std::slice::from_ref(vector))?)?;
        Self::winner(&votes[0])
    }

    fn predict_proba(&self, vector: &FeatureVector) -> Result<Option<Vec<f64>>> {
        let votes = self.votes(&to_records(std::slice::from_ref(vector))?)?;
        let total = self.trees.len() as f64;
        Ok(Some(votes[0].iter().map(|&v| v as f64 / total).collect()))
    }

    fn feature_importances(&self) -> Option<[f64; NUM_FEATURES]> {
        Some(self.importances)
    }

    fn predict_batch(&self, vectors: &[FeatureVector]) -> Result<Vec<usize>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        self.votes(&to_records(vectors)?)?
            .iter()
            .map(|v| Self::winner(v))
            .collect()
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let file = ForestFile {
            config: self.config.clone(),
            importances: self.importances,
            trees: self.trees.clone(),
        };
        let json = serde_json::to_string(&file)?;
        std::fs::write(dir.join(FOREST_FILE), json)?;
        Ok(())
    }
}

fn to_records(vectors: &[FeatureVector]) -> Result<Array2<f64>> {
    let flat: Vec<f64> = vectors.iter().flat_map(|v| v.as_slice().to_vec()).collect();
    Array2::from_shape_vec((vectors.len(), NUM_FEATURES), flat)
        .map_err(|e| CropError::Prediction(format!("Failed to build feature matrix: {}", e)))
}

/// Weighted Gini decrease per feature for one tree, measured on the
/// bootstrap rows it was grown from.
///
/// Class counts are integers and nodes are visited in a fixed order, so the
/// result is bit-for-bit reproducible.
fn gini_importance(
    tree: &DecisionTree<f64, usize>,
    records: &Array2<f64>,
    targets: &[usize],
    num_classes: usize,
) -> [f64; NUM_FEATURES] {
    let mut importance = [0.0; NUM_FEATURES];
    let rows: Vec<usize> = (0..targets.len()).collect();
    accumulate_decrease(tree.root_node(), &rows, records, targets, num_classes, &mut importance);
    importance
}

fn accumulate_decrease(
    node: &TreeNode<f64, usize>,
    rows: &[usize],
    records: &Array2<f64>,
    targets: &[usize],
    num_classes: usize,
    importance: &mut [f64; NUM_FEATURES],
) {
    if node.is_leaf() || rows.is_empty() {
        return;
    }

    let (feature, threshold, _) = node.split();
    // same routing as linfa's prediction
    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .partition(|&&row| records[(row, feature)] < threshold);

    let weighted = |subset: &[usize]| subset.len() as f64 * gini(subset, targets, num_classes);
    if let Some(slot) = importance.get_mut(feature) {
        *slot += weighted(rows) - weighted(left.as_slice()) - weighted(right.as_slice());
    }

    let children = node.children();
    for (child, subset) in children.into_iter().zip([&left, &right]) {
        if let Some(child) = child {
            accumulate_decrease(child, subset, records, targets, num_classes, importance);
        }
    }
}

fn gini(rows: &[usize], targets: &[usize], num_classes: usize) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let mut counts = vec![0usize; num_classes];
    for &row in rows {
        if let Some(count) = counts.get_mut(targets[row]) {
            *count += 1;
        }
    }
    let n = rows.len() as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Sum of the per-tree importances in tree order, normalized to sum to one
fn mean_importances(per_tree: &[[f64; NUM_FEATURES]]) -> [f64; NUM_FEATURES] {
    let mut sums = [0.0; NUM_FEATURES];
    for importance in per_tree {
        for (s, v) in sums.iter_mut().zip(importance.iter()) {
            *s += v.max(0.0);
        }
    }

    let total: f64 = sums.iter().sum();
    if total > 0.0 {
        sums.iter_mut().for_each(|s| *s /= total);
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{synthetic_dataset, CropSample};

    fn rice() -> FeatureVector {
        FeatureVector::new([90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9])
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 15,
            ..Default::default()
        }
    }

    #[test]
    fn test_forest_predicts_rice() {
        let forest = RandomForest::fit(&synthetic_dataset(30), &small_config()).unwrap();
        assert_eq!(forest.num_trees(), 15);
        assert_eq!(forest.predict(&rice()).unwrap(), "rice");
    }

    #[test]
    fn test_proba_is_a_distribution() {
        let forest = RandomForest::fit(&synthetic_dataset(30), &small_config()).unwrap();
        let proba = forest.predict_proba(&rice()).unwrap().unwrap();

        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let rice_id = forest.label_map().encode("rice").unwrap();
        assert_eq!(argmax(&proba), Some(rice_id));
        assert!(proba[rice_id] > 0.0 && proba[rice_id] <= 1.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let dataset = synthetic_dataset(20);
        let a = RandomForest::fit(&dataset, &small_config()).unwrap();
        let b = RandomForest::fit(&dataset, &small_config()).unwrap();

        let inputs = dataset.features();
        assert_eq!(a.predict_batch(&inputs).unwrap(), b.predict_batch(&inputs).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_importances_normalized() {
        let forest = RandomForest::fit(&synthetic_dataset(20), &small_config()).unwrap();
        let importances = forest.feature_importances().unwrap();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_importance_goes_to_separating_feature() {
        let samples = (0..20)
            .map(|i| CropSample {
                features: FeatureVector::new([
                    if i % 2 == 0 { 10.0 } else { 90.0 },
                    42.0,
                    43.0,
                    20.8,
                    82.0,
                    6.5,
                    202.9,
                ]),
                label: if i % 2 == 0 { "lentil" } else { "rice" }.to_string(),
            })
            .collect();
        let forest = RandomForest::fit(&CropDataset::new(samples), &small_config()).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert!(importances[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_gini_of_pure_and_even_nodes() {
        let targets = [0, 0, 1, 1];
        assert_eq!(gini(&[0, 1], &targets, 2), 0.0);
        assert!((gini(&[0, 1, 2, 3], &targets, 2) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[], &targets, 2), 0.0);
    }

    #[test]
    fn test_batch_matches_single() {
        let dataset = synthetic_dataset(10);
        let forest = RandomForest::fit(&dataset, &small_config()).unwrap();
        let inputs = dataset.features();

        let batch = forest.predict_batch(&inputs).unwrap();
        for (vector, id) in inputs.iter().zip(batch) {
            assert_eq!(forest.predict_id(vector).unwrap(), id);
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = synthetic_dataset(15);
        let forest = RandomForest::fit(&dataset, &small_config()).unwrap();
        forest.save(dir.path()).unwrap();

        let loaded = RandomForest::load(dir.path(), forest.label_map().clone()).unwrap();
        let inputs = dataset.features();
        assert_eq!(
            loaded.predict_batch(&inputs).unwrap(),
            forest.predict_batch(&inputs).unwrap()
        );
        assert_eq!(loaded.config(), forest.config());
        assert_eq!(loaded.feature_importances(), forest.feature_importances());
    }

    #[test]
    fn test_zero_trees_rejected() {
        let config = ForestConfig {
            n_trees: 0,
            ..Default::default()
        };
        assert!(RandomForest::fit(&synthetic_dataset(5), &config).is_err());
    }
}
