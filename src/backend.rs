//! Backend selection
//!
//! The crop network is small enough that the CPU `NdArray` backend is used for
//! both training and weight export.

use burn::backend::{Autodiff, NdArray};

/// Inference backend (no gradients)
pub type DefaultBackend = NdArray<f32>;

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    <DefaultBackend as burn::tensor::backend::Backend>::Device::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    "NdArray (CPU)"
}
