//! Multi-layer perceptron classifier
//!
//! Training uses the Burn module [`CropMlp`]. For serving, its linear layers
//! are exported into plain [`DenseLayer`]s so that the forward pass needs no
//! tensor runtime and the classifier can be shared freely between threads.
//!
//! Architecture: `Linear(7 -> 64) -> ReLU -> Linear(64 -> 32) -> ReLU -> Linear(32 -> C)`
//! with softmax applied at inference.

use std::path::Path;

use burn::{
    config::Config,
    module::{Module, Param},
    nn::{Linear, LinearConfig, Relu},
    record::CompactRecorder,
    tensor::{activation::softmax, backend::Backend, Tensor, TensorData},
};
use tracing::debug;

use super::{argmax, Classifier, ModelKind};
use crate::backend::{default_device, DefaultBackend};
use crate::features::{FeatureVector, NUM_FEATURES};
use crate::preprocessing::{LabelMap, NormalizationParams};
use crate::utils::error::{self, CropError};

/// Recorder file stem of the network weights (`network.mpk`)
pub const NETWORK_FILE: &str = "network";
pub const NETWORK_CONFIG_FILE: &str = "network_config.json";
pub const NORMALIZATION_FILE: &str = "normalization.json";

/// Configuration for the crop MLP
#[derive(Config, Debug)]
pub struct CropMlpConfig {
    /// Number of crops to classify
    pub num_classes: usize,

    #[config(default = "7")]
    pub num_features: usize,

    #[config(default = "64")]
    pub hidden1: usize,

    #[config(default = "32")]
    pub hidden2: usize,
}

impl CropMlpConfig {
    /// Initialize a network with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> CropMlp<B> {
        CropMlp {
            fc1: LinearConfig::new(self.num_features, self.hidden1).init(device),
            fc2: LinearConfig::new(self.hidden1, self.hidden2).init(device),
            fc3: LinearConfig::new(self.hidden2, self.num_classes).init(device),
            relu: Relu::new(),
        }
    }

    fn layer_shapes(&self) -> [(usize, usize); 3] {
        [
            (self.num_features, self.hidden1),
            (self.hidden1, self.hidden2),
            (self.hidden2, self.num_classes),
        ]
    }
}

/// Feed-forward crop classifier
#[derive(Module, Debug)]
pub struct CropMlp<B: Backend> {
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub fc3: Linear<B>,
    relu: Relu,
}

impl<B: Backend> CropMlp<B> {
    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Normalized features of shape [batch_size, num_features]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.fc1.forward(x));
        let x = self.relu.forward(self.fc2.forward(x));
        self.fc3.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(x), 1)
    }

    /// Copy the weights out into plain dense layers
    pub fn export(&self) -> error::Result<Vec<DenseLayer>> {
        [&self.fc1, &self.fc2, &self.fc3]
            .into_iter()
            .map(DenseLayer::from_linear)
            .collect()
    }

    /// Rebuild a network from exported dense layers
    pub fn from_layers(
        config: &CropMlpConfig,
        layers: &[DenseLayer],
        device: &B::Device,
    ) -> error::Result<Self> {
        let shapes = config.layer_shapes();
        if layers.len() != shapes.len() {
            return Err(CropError::Serialization(format!(
                "Expected {} layers, got {}",
                shapes.len(),
                layers.len()
            )));
        }
        for (layer, &(d_in, d_out)) in layers.iter().zip(shapes.iter()) {
            if layer.d_in != d_in || layer.d_out != d_out {
                return Err(CropError::Serialization(format!(
                    "Layer shape {}x{} does not match config {}x{}",
                    layer.d_in, layer.d_out, d_in, d_out
                )));
            }
        }

        Ok(Self {
            fc1: layers[0].to_linear(device),
            fc2: layers[1].to_linear(device),
            fc3: layers[2].to_linear(device),
            relu: Relu::new(),
        })
    }
}

/// A fully connected layer held as plain vectors.
///
/// `weight` is row-major `[d_in][d_out]`, matching Burn's `Linear` layout,
/// so `y = x W + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub d_in: usize,
    pub d_out: usize,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

impl DenseLayer {
    fn from_linear<B: Backend>(linear: &Linear<B>) -> error::Result<Self> {
        let [d_in, d_out] = linear.weight.val().dims();
        let weight = tensor_to_vec(linear.weight.val())?;
        let bias = match &linear.bias {
            Some(bias) => tensor_to_vec(bias.val())?,
            None => vec![0.0; d_out],
        };

        Ok(Self {
            d_in,
            d_out,
            weight,
            bias,
        })
    }

    fn to_linear<B: Backend>(&self, device: &B::Device) -> Linear<B> {
        let weight = Tensor::<B, 2>::from_floats(
            TensorData::new(self.weight.clone(), [self.d_in, self.d_out]),
            device,
        );
        let bias = Tensor::<B, 1>::from_floats(TensorData::new(self.bias.clone(), [self.d_out]), device);

        Linear {
            weight: Param::from_tensor(weight),
            bias: Some(Param::from_tensor(bias)),
        }
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (i, &x) in input.iter().enumerate().take(self.d_in) {
            let row = &self.weight[i * self.d_out..(i + 1) * self.d_out];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        out
    }
}

fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> error::Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| CropError::Serialization(format!("Failed to export weights: {:?}", e)))
}

/// Neural network classifier served from exported weights
#[derive(Debug, Clone)]
pub struct NeuralClassifier {
    config: CropMlpConfig,
    layers: Vec<DenseLayer>,
    normalization: NormalizationParams,
    labels: LabelMap,
}

impl NeuralClassifier {
    /// Wrap a trained network together with its preprocessing state
    pub fn from_module<B: Backend>(
        model: &CropMlp<B>,
        config: CropMlpConfig,
        normalization: NormalizationParams,
        labels: LabelMap,
    ) -> error::Result<Self> {
        if config.num_classes != labels.len() {
            return Err(CropError::Training(format!(
                "Network has {} outputs but label map has {} labels",
                config.num_classes,
                labels.len()
            )));
        }

        Ok(Self {
            layers: model.export()?,
            config,
            normalization,
            labels,
        })
    }

    /// Load network config, weights and normalization from an artifact directory
    pub fn load(dir: &Path, labels: LabelMap) -> error::Result<Self> {
        let config = CropMlpConfig::load(dir.join(NETWORK_CONFIG_FILE))
            .map_err(|e| CropError::Serialization(format!("Invalid network config: {}", e)))?;

        if config.num_features != NUM_FEATURES {
            return Err(CropError::SchemaMismatch(format!(
                "Network expects {} features, schema has {}",
                config.num_features, NUM_FEATURES
            )));
        }

        let device = default_device();
        let model: CropMlp<DefaultBackend> = config
            .init(&device)
            .load_file(dir.join(NETWORK_FILE), &CompactRecorder::new(), &device)
            .map_err(|e| CropError::Serialization(format!("Failed to load network weights: {:?}", e)))?;

        let normalization = NormalizationParams::load(&dir.join(NORMALIZATION_FILE))?;
        debug!("Loaded network with {} classes", config.num_classes);

        Self::from_module(&model, config, normalization, labels)
    }

    pub fn config(&self) -> &CropMlpConfig {
        &self.config
    }

    pub fn normalization(&self) -> &NormalizationParams {
        &self.normalization
    }

    /// Raw network outputs for one vector
    pub fn logits(&self, vector: &FeatureVector) -> error::Result<Vec<f32>> {
        let normalized = self.normalization.apply(vector)?;
        let mut activations: Vec<f32> = normalized.iter().map(|&v| v as f32).collect();

        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            activations = layer.forward(&activations);
            if i < last {
                activations.iter_mut().for_each(|a| *a = a.max(0.0));
            }
        }
        Ok(activations)
    }

    fn probabilities(&self, vector: &FeatureVector) -> error::Result<Vec<f64>> {
        let logits = self.logits(vector)?;
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f64> = logits.iter().map(|&l| ((l - max) as f64).exp()).collect();
        let sum: f64 = exps.iter().sum();
        if !(sum.is_finite() && sum > 0.0) {
            return Err(CropError::Prediction("Network produced non-finite outputs".to_string()));
        }
        Ok(exps.into_iter().map(|e| e / sum).collect())
    }
}

impl Classifier for NeuralClassifier {
    fn kind(&self) -> ModelKind {
        ModelKind::NeuralNetwork
    }

    fn label_map(&self) -> &LabelMap {
        &self.labels
    }

    fn predict_id(&self, vector: &FeatureVector) -> error::Result<usize> {
        let proba = self.probabilities(vector)?;
        argmax(&proba).ok_or_else(|| CropError::Prediction("Network has no outputs".to_string()))
    }

    fn predict_proba(&self, vector: &FeatureVector) -> error::Result<Option<Vec<f64>>> {
        self.probabilities(vector).map(Some)
    }

    fn save(&self, dir: &Path) -> error::Result<()> {
        let device = default_device();
        let model = CropMlp::<DefaultBackend>::from_layers(&self.config, &self.layers, &device)?;
        model
            .save_file(dir.join(NETWORK_FILE), &CompactRecorder::new())
            .map_err(|e| CropError::Serialization(format!("Failed to save network weights: {:?}", e)))?;

        self.config.save(dir.join(NETWORK_CONFIG_FILE))?;
        self.normalization.save(&dir.join(NORMALIZATION_FILE))?;
        Ok(())
    }
}
