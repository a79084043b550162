//! # Error Handling
//!
//! This module defines the custom error type for the `buah` library.
//!
//! The `ClassifierError` enum represents all possible errors that can occur
//! while turning an image into a ranked list of classes. Every variant is
//! terminal for the classification attempt that produced it: nothing is
//! retried and no partial results are returned.

use thiserror::Error;

pub type Result<T, E = ClassifierError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// No inference session was supplied to the classification call.
    #[error("model is not loaded")]
    ModelNotLoaded,
    /// The inference engine failed while running the model.
    #[error("inference failed: {0}")]
    Inference(String),
    /// The model output and the label list are not index-aligned.
    #[error("model produced {probabilities} probabilities but {labels} labels are configured")]
    LabelMismatch { probabilities: usize, labels: usize },
    #[error("model produced an empty output")]
    EmptyOutput,
    #[error("invalid label set: {0}")]
    InvalidLabels(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to fetch file: {0}")]
    Download(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
