//! Label map: crop names <-> dense class ids
//!
//! Ids are assigned over the alphabetically sorted set of distinct labels, so
//! fitting the same corpus always yields the same mapping. Persisted as a
//! label list file: one label per line, id 0 first.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{CropError, Result, ResultExt};

/// Bijection between label strings and class ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelMap {
    labels: Vec<String>,
    ids: HashMap<String, usize>,
}

impl LabelMap {
    /// Fit over a label corpus (duplicates allowed)
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        if labels.is_empty() {
            return Err(CropError::InsufficientData {
                rows: 0,
                required: 1,
            });
        }

        let unique: BTreeSet<&str> = labels.iter().map(|l| l.as_ref()).collect();
        Ok(Self::from_sorted(unique.into_iter().map(str::to_string).collect()))
    }

    fn from_sorted(labels: Vec<String>) -> Self {
        let ids = labels
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), id))
            .collect();
        Self { labels, ids }
    }

    /// Build from a stored label list, id 0 first
    fn from_list(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(CropError::Serialization("Label list is empty".to_string()));
        }

        let map = Self::from_sorted(labels);
        if map.ids.len() != map.labels.len() {
            return Err(CropError::Serialization(
                "Label list contains duplicate labels".to_string(),
            ));
        }
        Ok(map)
    }

    /// Class id of a label
    pub fn encode(&self, label: &str) -> Result<usize> {
        self.ids
            .get(label)
            .copied()
            .ok_or_else(|| CropError::UnknownLabel(label.to_string()))
    }

    /// Label of a class id
    pub fn decode(&self, id: usize) -> Result<&str> {
        self.labels
            .get(id)
            .map(String::as_str)
            .ok_or(CropError::UnknownLabelId {
                id,
                num_labels: self.labels.len(),
            })
    }

    /// Encode a whole label column
    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in id order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Write the label list file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content = self.labels.join("\n");
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Read a label list file; blank lines are skipped, duplicates rejected
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label list {:?}", path))?;

        let labels: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Self::from_list(labels).with_context(|| format!("Invalid label list {:?}", path))
    }
}

impl TryFrom<Vec<String>> for LabelMap {
    type Error = CropError;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Self::from_list(labels)
    }
}

impl From<LabelMap> for Vec<String> {
    fn from(map: LabelMap) -> Self {
        map.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec!["rice", "maize", "chickpea", "rice", "banana", "maize", "rice"]
    }

    #[test]
    fn test_ids_follow_alphabetical_order() {
        let map = LabelMap::fit(&corpus()).unwrap();
        assert_eq!(map.labels(), &["banana", "chickpea", "maize", "rice"]);
        assert_eq!(map.encode("banana").unwrap(), 0);
        assert_eq!(map.encode("rice").unwrap(), 3);
    }

    #[test]
    fn test_fit_is_independent_of_corpus_order() {
        let mut reversed = corpus();
        reversed.reverse();
        assert_eq!(
            LabelMap::fit(&corpus()).unwrap(),
            LabelMap::fit(&reversed).unwrap()
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let map = LabelMap::fit(&corpus()).unwrap();
        for label in corpus() {
            let id = map.encode(label).unwrap();
            assert_eq!(map.decode(id).unwrap(), label);
        }
    }

    #[test]
    fn test_unknown_id_and_label() {
        let map = LabelMap::fit(&corpus()).unwrap();
        assert!(matches!(
            map.decode(4),
            Err(CropError::UnknownLabelId { id: 4, num_labels: 4 })
        ));
        assert!(matches!(map.encode("coffee"), Err(CropError::UnknownLabel(_))));
    }

    #[test]
    fn test_empty_corpus() {
        let empty: Vec<String> = Vec::new();
        assert!(LabelMap::fit(&empty).is_err());
    }

    #[test]
    fn test_save_and_load_label_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");

        let map = LabelMap::fit(&corpus()).unwrap();
        map.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "banana\nchickpea\nmaize\nrice\n");

        assert_eq!(LabelMap::load(&path).unwrap(), map);
    }

    #[test]
    fn test_load_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "rice\nmaize\nrice\n").unwrap();

        assert!(LabelMap::load(&path).is_err());
    }

    #[test]
    fn test_serde_as_list() {
        let map = LabelMap::fit(&corpus()).unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"["banana","chickpea","maize","rice"]"#);

        let back: LabelMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_deserialize_rejects_duplicates() {
        let parsed = serde_json::from_str::<LabelMap>(r#"["rice","maize","rice"]"#);
        assert!(parsed.unwrap_err().to_string().contains("duplicate"));
        assert!(serde_json::from_str::<LabelMap>("[]").is_err());
    }
}
