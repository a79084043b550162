//! Fetching the files of a classifier repository on the Hugging Face Hub: the
//! ONNX model, its JSON config and its label CSV. Downloads are cached under `models/`.

use crate::error::{ClassifierError, Result};
use hf_hub::api::tokio::ApiBuilder;
use std::path::PathBuf;
use tracing::debug;

const MODEL_ROOT: &str = "models";

/// Downloads `file_path` from `repo_id`, reusing the local cache when present.
pub async fn get(repo_id: &str, file_path: &str) -> Result<PathBuf> {
    let api = ApiBuilder::new()
        .with_cache_dir(PathBuf::from(MODEL_ROOT))
        .with_progress(false)
        .build()
        .map_err(|e| ClassifierError::Download(e.to_string()))?;

    debug!(repo_id, file_path, "fetching from hub");
    api.model(repo_id.to_string())
        .get(file_path)
        .await
        .map_err(|e| ClassifierError::Download(format!("{}/{}: {}", repo_id, file_path, e)))
}

/// The ONNX model of a classifier repository.
pub struct ModelFile {
    repo_id: String,
    model_path: String,
}

impl ModelFile {
    pub fn new(repo_id: &str) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            model_path: "model.onnx".to_string(),
        }
    }

    pub async fn get(&self) -> Result<PathBuf> {
        get(&self.repo_id, &self.model_path).await
    }
}

/// CSV file that maps output indices to class names.
pub struct LabelCSVFile {
    repo_id: String,
    csv_path: String,
}

impl LabelCSVFile {
    pub fn new(repo_id: &str) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            csv_path: "labels.csv".to_string(),
        }
    }

    pub async fn get(&self) -> Result<PathBuf> {
        get(&self.repo_id, &self.csv_path).await
    }
}

pub struct ConfigFile {
    repo_id: String,
    config_path: String,
}

impl ConfigFile {
    pub fn new(repo_id: &str) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            config_path: "config.json".to_string(),
        }
    }

    pub async fn get(&self) -> Result<PathBuf> {
        get(&self.repo_id, &self.config_path).await
    }
}
