//! Feature Vector Contract
//!
//! The canonical, ordered schema of the seven soil/weather measurements a crop
//! classifier consumes. Classifiers index features positionally, so the order
//! defined here is shared by training and serving and is written into every
//! artifact manifest (see [`crate::model::artifact`]).
//!
//! ```rust,ignore
//! let raw = serde_json::json!({"ph": 6.5, "N": 90, "P": 42, "K": 43,
//!     "temperature": 20.8, "humidity": 82.0, "rainfall": 202.9});
//! let vector = validate(raw.as_object().unwrap(), RangePolicy::Enforce)?;
//! assert_eq!(vector.as_slice()[0], 90.0);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::error::{CropError, Result};

/// Number of input features
pub const NUM_FEATURES: usize = 7;

/// Canonical feature order. Changing it requires bumping [`FEATURE_SCHEMA_VERSION`].
pub const FEATURE_NAMES: [&str; NUM_FEATURES] =
    ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];

/// Version of the feature schema, recorded in artifact manifests
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// One of the seven input measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Nitrogen,
    Phosphorus,
    Potassium,
    Temperature,
    Humidity,
    Ph,
    Rainfall,
}

impl Feature {
    /// All features in canonical order
    pub const ALL: [Feature; NUM_FEATURES] = [
        Feature::Nitrogen,
        Feature::Phosphorus,
        Feature::Potassium,
        Feature::Temperature,
        Feature::Humidity,
        Feature::Ph,
        Feature::Rainfall,
    ];

    /// Position in the feature vector
    pub fn index(self) -> usize {
        self as usize
    }

    /// Field name as it appears in datasets and request payloads
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Inclusive physical bounds `(min, max)` used by range checks
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Feature::Nitrogen | Feature::Phosphorus | Feature::Potassium | Feature::Rainfall => {
                (0.0, f64::INFINITY)
            }
            Feature::Temperature => (-50.0, 60.0),
            Feature::Humidity => (0.0, 100.0),
            Feature::Ph => (0.0, 14.0),
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether [`validate`] enforces the physical bounds of each feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    #[default]
    Enforce,
    Skip,
}

/// Seven measurements in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    /// Build from values already in canonical order
    pub fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self(values)
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn as_array(&self) -> &[f64; NUM_FEATURES] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Single-precision copy for neural network input
    pub fn to_f32(&self) -> [f32; NUM_FEATURES] {
        self.0.map(|v| v as f32)
    }

    /// Check every value against its feature bounds
    pub fn check_ranges(&self) -> Result<()> {
        for feature in Feature::ALL {
            let value = self.get(feature);
            let (min, max) = feature.bounds();
            if value < min || value > max {
                return Err(CropError::RangeViolation {
                    field: feature.name().to_string(),
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

impl From<[f64; NUM_FEATURES]> for FeatureVector {
    fn from(values: [f64; NUM_FEATURES]) -> Self {
        Self::new(values)
    }
}

/// Validate a raw field mapping against the feature schema.
///
/// Fields are looked up in canonical order, so the first absent field is the
/// one reported. Numbers and numeric strings are accepted; booleans, nulls,
/// containers and non-finite values are not. Range checks run after every
/// field has been found and converted.
pub fn validate(raw: &Map<String, Value>, policy: RangePolicy) -> Result<FeatureVector> {
    if raw.is_empty() {
        return Err(CropError::EmptyInput);
    }

    let mut values = [0.0; NUM_FEATURES];
    for feature in Feature::ALL {
        let name = feature.name();
        let value = raw
            .get(name)
            .ok_or_else(|| CropError::MissingField(name.to_string()))?;
        values[feature.index()] = coerce(name, value)?;
    }

    let vector = FeatureVector::new(values);
    if policy == RangePolicy::Enforce {
        vector.check_ranges()?;
    }
    Ok(vector)
}

/// Validate any JSON value; non-objects are treated as missing input
pub fn validate_value(raw: &Value, policy: RangePolicy) -> Result<FeatureVector> {
    match raw {
        Value::Object(map) => validate(map, policy),
        _ => Err(CropError::EmptyInput),
    }
}

fn coerce(field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(CropError::TypeConversion {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rice_input() -> Value {
        json!({
            "N": 90,
            "P": 42,
            "K": 43,
            "temperature": 20.8,
            "humidity": 82.0,
            "ph": 6.5,
            "rainfall": 202.9
        })
    }

    #[test]
    fn test_feature_order_is_canonical() {
        let names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names, FEATURE_NAMES);
        assert_eq!(Feature::Ph.index(), 5);
    }

    #[test]
    fn test_validate_rice_measurements() {
        let vector = validate_value(&rice_input(), RangePolicy::Enforce).unwrap();
        assert_eq!(
            vector.as_array(),
            &[90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9]
        );
    }

    #[test]
    fn test_validate_ignores_key_order() {
        let shuffled = json!({
            "rainfall": 202.9,
            "ph": 6.5,
            "humidity": 82.0,
            "temperature": 20.8,
            "K": 43,
            "P": 42,
            "N": 90
        });
        let a = validate_value(&shuffled, RangePolicy::Enforce).unwrap();
        let b = validate_value(&rice_input(), RangePolicy::Enforce).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_each_field_is_named() {
        for name in FEATURE_NAMES {
            let mut input = rice_input();
            input.as_object_mut().unwrap().remove(name);

            match validate_value(&input, RangePolicy::Enforce) {
                Err(CropError::MissingField(field)) => assert_eq!(field, name),
                other => panic!("expected MissingField({}), got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_first_missing_field_in_canonical_order() {
        let input = json!({"N": 1, "P": 2, "K": 3, "temperature": 20.0});
        match validate_value(&input, RangePolicy::Enforce) {
            Err(CropError::MissingField(field)) => assert_eq!(field, "humidity"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut input = rice_input();
        input["ph"] = json!(" 6.5 ");
        let vector = validate_value(&input, RangePolicy::Enforce).unwrap();
        assert_eq!(vector.get(Feature::Ph), 6.5);
    }

    #[test]
    fn test_non_numeric_values_are_rejected() {
        for bad in [json!("acidic"), json!(true), json!(null), json!([1.0]), json!("NaN")] {
            let mut input = rice_input();
            input["humidity"] = bad.clone();
            match validate_value(&input, RangePolicy::Enforce) {
                Err(CropError::TypeConversion { field, .. }) => assert_eq!(field, "humidity"),
                other => panic!("expected TypeConversion for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_range_checks() {
        let mut input = rice_input();
        input["humidity"] = json!(120.0);

        match validate_value(&input, RangePolicy::Enforce) {
            Err(CropError::RangeViolation { field, max, .. }) => {
                assert_eq!(field, "humidity");
                assert_eq!(max, 100.0);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let vector = validate_value(&input, RangePolicy::Skip).unwrap();
        assert_eq!(vector.get(Feature::Humidity), 120.0);
    }

    #[test]
    fn test_negative_nutrients_rejected() {
        let mut input = rice_input();
        input["K"] = json!(-1);
        let err = validate_value(&input, RangePolicy::Enforce).unwrap_err();
        assert_eq!(err.field(), Some("K"));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let vector = FeatureVector::new([0.0, 0.0, 0.0, -50.0, 100.0, 14.0, 0.0]);
        assert!(vector.check_ranges().is_ok());
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            validate_value(&json!({}), RangePolicy::Enforce),
            Err(CropError::EmptyInput)
        ));
        assert!(matches!(
            validate_value(&json!([1, 2, 3]), RangePolicy::Enforce),
            Err(CropError::EmptyInput)
        ));
    }

    #[test]
    fn test_extra_keys_ignored() {
        let mut input = rice_input();
        input["label"] = json!("rice");
        assert!(validate_value(&input, RangePolicy::Enforce).is_ok());
    }
}
