//! # Buah
//!
//! Buah is a library for single-image classification with ONNX models. It turns
//! one decoded image into a fixed-shape tensor, runs it through a classifier and
//! pairs the resulting probabilities with an ordered label set.
//!
//! ## Features
//!
//! - **High-level API**: `ClassificationPipeline` for image to ranked classes.
//! - **ONNX Runtime**: Powered by `ort` for efficient, cross-platform inference.
//! - **Injected sessions**: The model is passed to each call through the
//!   `InferenceEngine` trait instead of living in global state.
//! - **Checked labels**: Label and model output alignment is validated, not assumed.
//!
//! ## Modules
//!
//! - `pipeline`: The main entry point, plus a request-serializing service.
//! - `classifier`: The inference engine trait and the ONNX Runtime session.
//! - `processor`: Image preprocessing into `[1, 3, H, W]` tensors.
//! - `ranking`: Pairing probabilities with labels and picking the top class.
//! - `labels`: The ordered class label set.
//! - `render`: Text output for a ranking.
//! - `config`: Model input configuration.
//! - `file`: Locating model, config and label files.
//! - `error`: Contains the error types for the library.
//! - `prelude`: A collection of the most commonly used types.

pub mod config;
pub mod error;
pub mod file;
pub mod pipeline;
pub mod prelude;

pub mod classifier;
pub mod labels;
pub mod processor;
pub mod ranking;
pub mod render;
