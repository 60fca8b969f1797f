//! Crop Recommendation CLI
//!
//! Train classifiers from the labeled CSV corpus, run single predictions
//! against an artifact directory, and evaluate artifacts on a dataset.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use tracing::info;

use crop_recommend::dataset::{CropDataset, DEFAULT_DATASET_PATH};
use crop_recommend::model::ModelKind;
use crop_recommend::training::{pipeline, TrainingConfig};
use crop_recommend::utils::logging::{init_logging, LogConfig, LogLevel};
use crop_recommend::{CropPredictor, RangePolicy};

/// Crop recommendation from soil and weather measurements
#[derive(Parser, Debug)]
#[command(name = "crop_recommend")]
#[command(version)]
#[command(about = "Train and query crop recommendation models", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false", global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a classifier and write its artifact directory
    Train {
        /// Path to the labeled CSV dataset
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        data: PathBuf,

        /// Classifier variant (forest or mlp)
        #[arg(short, long, default_value = "forest")]
        model: ModelKind,

        /// Output artifact directory (defaults to artifacts/<model>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of trees (forest)
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Maximum tree depth (forest; unbounded when omitted)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Training epochs (mlp)
        #[arg(short, long, default_value = "50")]
        epochs: usize,

        /// Batch size (mlp)
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Learning rate (mlp)
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,
    },

    /// Recommend a crop for one set of measurements
    Predict {
        /// Artifact directory produced by `train`
        #[arg(short, long, default_value = "artifacts/forest")]
        artifacts: PathBuf,

        /// Measurements as a JSON object
        #[arg(short, long, conflicts_with_all = ["n", "p", "k", "temperature", "humidity", "ph", "rainfall"])]
        input: Option<String>,

        /// Nitrogen
        #[arg(long)]
        n: Option<f64>,

        /// Phosphorus
        #[arg(long)]
        p: Option<f64>,

        /// Potassium
        #[arg(long)]
        k: Option<f64>,

        /// Temperature in degrees Celsius
        #[arg(long, allow_hyphen_values = true)]
        temperature: Option<f64>,

        /// Relative humidity in percent
        #[arg(long)]
        humidity: Option<f64>,

        /// Soil pH
        #[arg(long)]
        ph: Option<f64>,

        /// Rainfall in mm
        #[arg(long)]
        rainfall: Option<f64>,

        /// Accept values outside the physical ranges
        #[arg(long, default_value = "false")]
        no_range_checks: bool,
    },

    /// Evaluate an artifact directory on a labeled dataset
    Evaluate {
        /// Artifact directory produced by `train`
        #[arg(short, long, default_value = "artifacts/forest")]
        artifacts: PathBuf,

        /// Path to the labeled CSV dataset
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        data: PathBuf,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the labeled CSV dataset
        #[arg(short, long, default_value = DEFAULT_DATASET_PATH)]
        data: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    if let Some(level) = &cli.log_level {
        log_config = log_config.with_level(LogLevel::from_name(level));
    }
    let _ = init_logging(&log_config);

    match cli.command {
        Commands::Train {
            data,
            model,
            output,
            test_fraction,
            seed,
            trees,
            max_depth,
            epochs,
            batch_size,
            learning_rate,
        } => {
            let mut config = TrainingConfig::for_model(model);
            config.data_path = data;
            if let Some(output) = output {
                config.output_dir = output;
            }
            config.test_fraction = test_fraction;
            config.seed = seed;
            config.forest.n_trees = trees;
            config.forest.max_depth = max_depth;
            config.forest.seed = seed;
            config.mlp.epochs = epochs;
            config.mlp.batch_size = batch_size;
            config.mlp.learning_rate = learning_rate;
            config.mlp.seed = seed;

            cmd_train(&config)?;
        }

        Commands::Predict {
            artifacts,
            input,
            n,
            p,
            k,
            temperature,
            humidity,
            ph,
            rainfall,
            no_range_checks,
        } => {
            let raw = match input {
                Some(text) => serde_json::from_str(&text).context("--input is not valid JSON")?,
                None => fields_to_json(&[
                    ("N", n),
                    ("P", p),
                    ("K", k),
                    ("temperature", temperature),
                    ("humidity", humidity),
                    ("ph", ph),
                    ("rainfall", rainfall),
                ]),
            };
            let policy = if no_range_checks {
                RangePolicy::Skip
            } else {
                RangePolicy::Enforce
            };
            cmd_predict(&artifacts, &raw, policy)?;
        }

        Commands::Evaluate { artifacts, data } => {
            cmd_evaluate(&artifacts, &data)?;
        }

        Commands::Stats { data } => {
            cmd_stats(&data)?;
        }
    }

    Ok(())
}

/// Build a JSON object from the flags that were given
fn fields_to_json(fields: &[(&str, Option<f64>)]) -> Value {
    let map = fields
        .iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), json!(v))))
        .collect();
    Value::Object(map)
}

fn cmd_train(config: &TrainingConfig) -> Result<()> {
    println!(
        "{} Training {} on {:?}",
        "==>".green().bold(),
        config.model.to_string().cyan(),
        config.data_path
    );

    let report = pipeline::run(config).context("Training failed")?;

    println!();
    println!("{}", report.display());
    println!(
        "{} Artifacts written to {:?}",
        "Done:".green().bold(),
        report.output_dir
    );
    Ok(())
}

fn cmd_predict(artifacts: &Path, raw: &Value, policy: RangePolicy) -> Result<()> {
    let predictor = CropPredictor::load(artifacts, policy)?;

    let result = match predictor.predict_json(raw) {
        Ok(result) => result,
        Err(e) if e.is_validation() => bail!("{} {}", "Invalid input:".red(), e),
        Err(e) => return Err(e.into()),
    };

    println!(
        "{} {}",
        "Recommended crop:".green().bold(),
        result.prediction.bold()
    );
    if let Some(confidence) = result.confidence {
        println!("Confidence: {:.1}%", confidence * 100.0);
    }
    if !result.top_k.is_empty() {
        println!("Top candidates:");
        for (rank, entry) in result.top_k.iter().enumerate() {
            println!("  {}. {:<12} {:.1}%", rank + 1, entry.label, entry.probability * 100.0);
        }
    }
    info!("Inference took {:.3}ms", result.inference_time_ms);
    Ok(())
}

fn cmd_evaluate(artifacts: &Path, data: &Path) -> Result<()> {
    let (classifier, manifest) = crop_recommend::load_classifier(artifacts)
        .with_context(|| format!("Failed to load artifacts from {:?}", artifacts))?;
    let dataset = CropDataset::from_csv_path(data)?;

    let metrics = pipeline::evaluate_classifier(classifier.as_ref(), &dataset)?;

    println!(
        "{} {} model (run {}) on {} samples",
        "Evaluated".green().bold(),
        manifest.model_kind,
        manifest.run_id,
        metrics.total_samples
    );
    println!("Accuracy: {:.4}", metrics.accuracy);
    println!();
    println!("{}", metrics.classification_report());
    Ok(())
}

fn cmd_stats(data: &Path) -> Result<()> {
    let stats = CropDataset::from_csv_path(data)?.stats();

    println!("{}", "Dataset statistics".cyan().bold());
    println!("Samples: {}", stats.total_samples);
    println!("Crops:   {}", stats.num_classes);
    println!();
    for (label, count) in &stats.class_counts {
        println!("  {:<14} {}", label, count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_train() {
        let cli = Cli::try_parse_from([
            "crop_recommend",
            "train",
            "--model",
            "mlp",
            "--epochs",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Train { model, epochs, .. } => {
                assert_eq!(model, ModelKind::NeuralNetwork);
                assert_eq!(epochs, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_fields_to_json_skips_missing() {
        let raw = fields_to_json(&[("N", Some(90.0)), ("ph", None)]);
        assert_eq!(raw, json!({"N": 90.0}));
    }

    #[test]
    fn test_input_conflicts_with_fields() {
        let parsed = Cli::try_parse_from([
            "crop_recommend",
            "predict",
            "--input",
            "{}",
            "--ph",
            "6.5",
        ]);
        assert!(parsed.is_err());
    }
}
