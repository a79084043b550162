//! # Buah
//!
//! Command line front end for the `buah` library: classifies one image file
//! with an ONNX model and prints the probability of every class.

mod args;

use anyhow::{Context, Result};
use args::{Args, Commands};
use buah::{
    classifier::{ClassifierModel, Device},
    config::ClassifierConfig,
    labels::ClassLabels,
    pipeline::{ClassificationPipeline, ProgressCallback},
    ranking::Ranking,
    render::{render_predictions, GENERIC_FAILURE_MESSAGE},
};
use clap::Parser;
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// The main entry point for the `buah` application.
#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let args = Args::parse();

    match args.command {
        Commands::Classify {
            image,
            model,
            repo,
            config,
            labels,
            sorted,
            json,
        } => {
            let source = match repo {
                Some(repo_id) => ModelSource::Hub(repo_id),
                None => ModelSource::Local(model),
            };
            match run_classify(&image, source, config, labels).await {
                Ok(ranking) => {
                    if let Err(e) = print_ranking(&ranking, sorted, json) {
                        error!("Failed to print results: {:#}", e);
                        return ExitCode::FAILURE;
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Error classifying image: {:#}", e);
                    eprintln!("{}", GENERIC_FAILURE_MESSAGE);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

enum ModelSource {
    Local(PathBuf),
    Hub(String),
}

/// Loads the model and labels, then classifies `image`.
async fn run_classify(
    image: &Path,
    source: ModelSource,
    config_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
) -> Result<Ranking> {
    ClassifierModel::init(Device::cpu())?;

    let (mut model, config, hub_labels) = match source {
        ModelSource::Local(path) => {
            let model = ClassifierModel::load(&path)
                .with_context(|| format!("Failed to load model {:?}", path))?;
            (model, None, None)
        }
        ModelSource::Hub(repo_id) => {
            let model = ClassifierModel::from_pretrained(&repo_id).await?;
            let config = match ClassifierConfig::from_pretrained(&repo_id).await {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("No usable config.json in {}: {}", repo_id, e);
                    None
                }
            };
            let labels = match ClassLabels::from_pretrained(&repo_id).await {
                Ok(labels) => Some(labels),
                Err(e) => {
                    warn!("No usable labels.csv in {}: {}", repo_id, e);
                    None
                }
            };
            (model, config, labels)
        }
    };

    let config = match config_path {
        Some(path) => ClassifierConfig::load(&path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => config.unwrap_or_default(),
    };

    let mut pipeline = ClassificationPipeline::from_config(&config)?;
    let labels = match labels_path {
        Some(path) => Some(
            ClassLabels::load(&path).with_context(|| format!("Failed to load labels {:?}", path))?,
        ),
        None => hub_labels,
    };
    if let Some(labels) = labels {
        pipeline = pipeline.with_labels(labels);
    }

    pipeline.validate(&mut model)?;

    let progress_callback: ProgressCallback = Box::new(|progress: f32, message: String| {
        debug!(progress, "{}", message);
    });

    let ranking = pipeline
        .classify_file(image, Some(&mut model), Some(progress_callback))
        .await
        .with_context(|| format!("Failed to classify {:?}", image))?;
    Ok(ranking)
}

fn print_ranking(ranking: &Ranking, sorted: bool, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "predictions": ranking.to_map(),
            "top": ranking.top,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if sorted {
        println!("{}", render_predictions(ranking.sorted(), &ranking.top));
    } else {
        println!("{}", render_predictions(&ranking.predictions, &ranking.top));
    }
    Ok(())
}
