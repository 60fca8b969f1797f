//! Preprocessing shared by training and serving
//!
//! - `label_map`: crop names to dense class ids and back
//! - `normalization`: z-score standardisation of feature vectors
//!
//! Both are fitted once on training data, persisted next to the trained
//! model and treated as read-only afterwards.

pub mod label_map;
pub mod normalization;

pub use label_map::LabelMap;
pub use normalization::NormalizationParams;
