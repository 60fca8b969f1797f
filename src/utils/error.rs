//! Error Handling Module
//!
//! Defines the error taxonomy for the crop recommendation library.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Main error type for crop recommendation operations
#[derive(Error, Debug)]
pub enum CropError {
    /// Request payload was empty or not an object
    #[error("No input data provided")]
    EmptyInput,

    /// A required feature was absent from the input
    #[error("Missing feature: {0}")]
    MissingField(String),

    /// A feature value could not be coerced to a finite float
    #[error("Feature '{field}' is not a number: {value}")]
    TypeConversion { field: String, value: String },

    /// A feature value is outside its physical range
    #[error("Feature '{field}' = {value} is outside the allowed range [{min}, {max}]")]
    RangeViolation {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Not enough rows to fit preprocessing parameters
    #[error("Insufficient data: got {rows} rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    /// A normalization column has zero standard deviation
    #[error("Cannot normalize feature '{field}': standard deviation is zero")]
    DivisionByZero { field: String },

    /// A label that is not part of the fitted label map
    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    /// A class id outside the fitted label map
    #[error("Unknown label id {id} (label map has {num_labels} labels)")]
    UnknownLabelId { id: usize, num_labels: usize },

    /// Trained artifacts are missing or unusable
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Unexpected failure inside a classifier
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Artifact was produced for a different feature schema
    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Error with dataset loading or splitting
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error while fitting a classifier
    #[error("Training error: {0}")]
    Training(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CropError {
    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CropError::EmptyInput
                | CropError::MissingField(_)
                | CropError::TypeConversion { .. }
                | CropError::RangeViolation { .. }
        )
    }

    /// Name of the offending feature, when the error concerns one
    pub fn field(&self) -> Option<&str> {
        match self {
            CropError::MissingField(field)
            | CropError::TypeConversion { field, .. }
            | CropError::RangeViolation { field, .. }
            | CropError::DivisionByZero { field } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CropError {
    fn from(err: serde_json::Error) -> Self {
        CropError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for CropError {
    fn from(err: csv::Error) -> Self {
        CropError::Dataset(err.to_string())
    }
}

/// Convenience Result type for crop recommendation operations
pub type Result<T> = std::result::Result<T, CropError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| CropError::Serialization(format!("{}: {}", f(), e)))
    }
}
