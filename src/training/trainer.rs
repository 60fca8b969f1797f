//! Neural network training loop
//!
//! Trains [`CropMlp`] with the Burn autodiff backend:
//! - Inputs standardised with parameters fitted on the training partition
//! - Cross-entropy loss, Adam optimizer
//! - Mini-batches reshuffled every epoch with a seeded `ChaCha8Rng`
//! - Held-out accuracy reported after every epoch

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::Backend, ElementConversion, Int, Tensor, TensorData},
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::backend::{backend_name, default_device, TrainingBackend};
use crate::dataset::CropDataset;
use crate::features::NUM_FEATURES;
use crate::model::{CropMlp, CropMlpConfig, MlpConfig, NeuralClassifier};
use crate::preprocessing::{LabelMap, NormalizationParams};
use crate::utils::error::{CropError, Result};
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::{AccuracyTracker, RunningAverage};

/// Normalized inputs with their class ids
struct EncodedSet {
    inputs: Vec<[f32; NUM_FEATURES]>,
    targets: Vec<usize>,
}

impl EncodedSet {
    fn new(
        dataset: &CropDataset,
        normalization: &NormalizationParams,
        labels: &LabelMap,
    ) -> Result<Self> {
        let mut inputs = Vec::with_capacity(dataset.len());
        let mut targets = Vec::with_capacity(dataset.len());

        for sample in &dataset.samples {
            // held-out crops never seen in training cannot be scored
            let Ok(target) = labels.encode(&sample.label) else {
                continue;
            };
            let z = normalization.apply(&sample.features)?;
            inputs.push(z.map(|v| v as f32));
            targets.push(target);
        }

        Ok(Self { inputs, targets })
    }

    fn len(&self) -> usize {
        self.targets.len()
    }

    fn batch<B: Backend>(
        &self,
        indices: &[usize],
        device: &B::Device,
    ) -> (Tensor<B, 2>, Tensor<B, 1, Int>, Vec<usize>) {
        let flat: Vec<f32> = indices
            .iter()
            .flat_map(|&i| self.inputs[i].iter().copied())
            .collect();
        let targets: Vec<usize> = indices.iter().map(|&i| self.targets[i]).collect();
        let target_data: Vec<i64> = targets.iter().map(|&t| t as i64).collect();

        let inputs =
            Tensor::<B, 2>::from_floats(TensorData::new(flat, [indices.len(), NUM_FEATURES]), device);
        let target_tensor =
            Tensor::<B, 1, Int>::from_data(TensorData::new(target_data, [indices.len()]), device);

        (inputs, target_tensor, targets)
    }
}

/// Class ids of the largest logit per row
fn predicted_ids<B: Backend>(logits: Tensor<B, 2>) -> Result<Vec<usize>> {
    let ids: Vec<i64> = logits
        .argmax(1)
        .squeeze::<1>(1)
        .into_data()
        .convert::<i64>()
        .to_vec()
        .map_err(|e| CropError::Training(format!("Failed to read predictions: {:?}", e)))?;
    Ok(ids.into_iter().map(|id| id as usize).collect())
}

/// Accuracy of a network on an encoded set
fn evaluate<B: Backend>(model: &CropMlp<B>, set: &EncodedSet, device: &B::Device) -> Result<f64> {
    if set.len() == 0 {
        return Ok(0.0);
    }
    let indices: Vec<usize> = (0..set.len()).collect();
    let (inputs, _, targets) = set.batch::<B>(&indices, device);

    let mut tracker = AccuracyTracker::new();
    tracker.add_batch(&predicted_ids(model.forward(inputs))?, &targets);
    Ok(tracker.accuracy())
}

/// Train the crop network and wrap it for serving
pub fn train_network(
    train: &CropDataset,
    holdout: Option<&CropDataset>,
    config: &MlpConfig,
) -> Result<NeuralClassifier> {
    config.validate()?;

    let labels = LabelMap::fit(&train.labels())?;
    let normalization = NormalizationParams::fit(&train.features())?;
    let train_set = EncodedSet::new(train, &normalization, &labels)?;
    let holdout_set = holdout
        .map(|h| EncodedSet::new(h, &normalization, &labels))
        .transpose()?;

    let network_config = CropMlpConfig::new(labels.len())
        .with_hidden1(config.hidden1)
        .with_hidden2(config.hidden2);

    info!(
        "Training network: {} samples, {} classes, {} epochs, batch size {}, lr {}",
        train_set.len(),
        labels.len(),
        config.epochs,
        config.batch_size,
        config.learning_rate
    );
    info!("Backend: {}", backend_name());

    let device = default_device();
    <TrainingBackend as Backend>::seed(config.seed);

    let mut model: CropMlp<TrainingBackend> = network_config.init(&device);
    let mut optimizer = AdamConfig::new().init::<TrainingBackend, CropMlp<TrainingBackend>>();
    let loss_fn = CrossEntropyLossConfig::new().init(&device);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut order: Vec<usize> = (0..train_set.len()).collect();
    let mut logger = TrainingLogger::new(config.epochs);
    let mut holdout_accuracy = 0.0;

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);
        order.shuffle(&mut rng);

        let mut loss_avg = RunningAverage::new();
        let mut accuracy = AccuracyTracker::new();

        for batch_indices in order.chunks(config.batch_size) {
            let (inputs, targets, target_ids) = train_set.batch::<TrainingBackend>(batch_indices, &device);

            let output = model.forward(inputs);
            let loss = loss_fn.forward(output.clone(), targets);

            let loss_value: f64 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                return Err(CropError::Training(format!(
                    "Loss diverged at epoch {}",
                    epoch + 1
                )));
            }
            loss_avg.add(loss_value);
            accuracy.add_batch(&predicted_ids(output)?, &target_ids);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        if let Some(set) = &holdout_set {
            holdout_accuracy = evaluate(&model.valid(), set, &device)?;
        }
        logger.end_epoch(loss_avg.average(), accuracy.accuracy(), holdout_accuracy);
        debug!("Epoch {} processed {} batches", epoch + 1, loss_avg.count());
    }

    logger.log_complete(holdout_accuracy);

    NeuralClassifier::from_module(&model.valid(), network_config, normalization, labels)
}
