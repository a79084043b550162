//! This module provides the inference side of the classifier.
//!
//! It includes:
//! - The `InferenceEngine` trait, the seam between the pipeline and whatever runs the model.
//! - `classify`, which feeds one tensor to an engine and reads back its probabilities.
//! - `ClassifierModel`, an ONNX Runtime implementation of `InferenceEngine`.
//!
//! The `Device` enum allows for specifying the hardware to run the model on.

use std::path::Path;

use ndarray::{Array, Ix4};
use ort::{
    execution_providers::CPUExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tracing::{debug, info};

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

#[cfg(feature = "tensorrt")]
use ort::execution_providers::TensorRTExecutionProvider;

#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;

use crate::{
    error::{ClassifierError, Result},
    file::ModelFile,
    ranking::ProbabilityVector,
};

/// Represents the execution device for the ONNX model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    /// Use the CPU for inference.
    Cpu,
    /// Use the CUDA execution provider.
    #[cfg(feature = "cuda")]
    Cuda(i32),
    /// Use the TensorRT execution provider.
    #[cfg(feature = "tensorrt")]
    TensorRT(i32),
    /// Use the CoreML execution provider (for macOS).
    #[cfg(feature = "coreml")]
    CoreML,
}

impl Device {
    /// Creates a list of `Device` instances for CPU execution.
    pub fn cpu() -> Vec<Self> {
        vec![Self::Cpu]
    }

    /// Creates a list of `Device` instances for CUDA execution on specified GPUs.
    #[cfg(feature = "cuda")]
    pub fn cuda_devices(device_ids: Vec<i32>) -> Vec<Self> {
        device_ids.into_iter().map(Self::Cuda).collect()
    }

    /// Creates a list of `Device` instances for TensorRT execution on specified GPUs.
    #[cfg(feature = "tensorrt")]
    pub fn tensorrt_devices(device_ids: Vec<i32>) -> Vec<Self> {
        device_ids.into_iter().map(Self::TensorRT).collect()
    }

    /// Creates a list of `Device` instances for CoreML execution.
    #[cfg(feature = "coreml")]
    pub fn coreml() -> Vec<Self> {
        vec![Self::CoreML]
    }
}

/// Something that can run a model on a single input tensor.
///
/// Names are the model's declared input and output names, in declaration order.
pub trait InferenceEngine {
    fn input_names(&self) -> &[String];

    fn output_names(&self) -> &[String];

    /// Feeds `tensor` under `input` and returns the flattened values of `output`.
    fn run(&mut self, input: &str, tensor: Array<f32, Ix4>, output: &str) -> Result<Vec<f32>>;
}

/// Runs `tensor` through `session` using its first declared input and output.
pub fn classify<E>(tensor: Array<f32, Ix4>, session: Option<&mut E>) -> Result<ProbabilityVector>
where
    E: InferenceEngine + ?Sized,
{
    classify_with_names(tensor, session, None, None)
}

/// Like [`classify`], with optional overrides for the input and output names.
pub fn classify_with_names<E>(
    tensor: Array<f32, Ix4>,
    session: Option<&mut E>,
    input_name: Option<&str>,
    output_name: Option<&str>,
) -> Result<ProbabilityVector>
where
    E: InferenceEngine + ?Sized,
{
    let session = session.ok_or(ClassifierError::ModelNotLoaded)?;

    let input = match input_name {
        Some(name) => name.to_string(),
        None => session
            .input_names()
            .first()
            .cloned()
            .ok_or_else(|| ClassifierError::Inference("Model has no inputs".to_string()))?,
    };
    let output = match output_name {
        Some(name) => name.to_string(),
        None => session
            .output_names()
            .first()
            .cloned()
            .ok_or_else(|| ClassifierError::Inference("Model has no outputs".to_string()))?,
    };

    debug!(input = %input, output = %output, shape = ?tensor.shape(), "running inference");
    let probabilities = session.run(&input, tensor, &output)?;
    Ok(ProbabilityVector::new(probabilities))
}

fn ort_error<E: std::fmt::Display>(e: E) -> ClassifierError {
    ClassifierError::Inference(e.to_string())
}

/// A wrapper around an ONNX Runtime session for image classification.
#[derive(Debug)]
pub struct ClassifierModel {
    session: Session,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl ClassifierModel {
    /// Initializes the ONNX Runtime with a list of execution providers.
    ///
    /// This function should be called once before creating any `ClassifierModel` instances.
    pub fn init(devices: Vec<Device>) -> Result<()> {
        let _ = tracing_subscriber::fmt::try_init();

        let mut providers = Vec::new();
        for device in devices {
            let provider = match device {
                Device::Cpu => CPUExecutionProvider::default().build(),
                #[cfg(feature = "cuda")]
                Device::Cuda(device_id) => CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                #[cfg(feature = "tensorrt")]
                Device::TensorRT(device_id) => TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                #[cfg(feature = "coreml")]
                Device::CoreML => CoreMLExecutionProvider::default().build(),
            };
            providers.push(provider);
        }

        ort::init()
            .with_execution_providers(providers)
            .commit()
            .map_err(ort_error)?;
        Ok(())
    }

    /// Loads a model from a local `.onnx` file.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = Session::builder()
            .map_err(ort_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort_error)?
            .with_intra_threads(num_cpus::get())
            .map_err(ort_error)?
            .commit_from_file(model_path.as_ref())
            .map_err(ort_error)?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        info!(
            path = %model_path.as_ref().display(),
            inputs = ?input_names,
            outputs = ?output_names,
            "model loaded"
        );

        Ok(Self {
            session,
            input_names,
            output_names,
        })
    }

    /// Loads a model from a Hugging Face repository.
    ///
    /// This will download the model file if it's not already cached.
    pub async fn from_pretrained(repo_id: &str) -> Result<Self> {
        let model_path = ModelFile::new(repo_id).get().await?;
        Self::load(&model_path)
    }
}

impl InferenceEngine for ClassifierModel {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn run(&mut self, input: &str, tensor: Array<f32, Ix4>, output: &str) -> Result<Vec<f32>> {
        if !self.output_names.iter().any(|name| name == output) {
            return Err(ClassifierError::Inference(format!(
                "Model output '{}' not found",
                output
            )));
        }

        let input_tensor = Tensor::from_array(tensor).map_err(ort_error)?;

        let outputs = self
            .session
            .run(ort::inputs![input => input_tensor])
            .map_err(ort_error)?;

        let preds = outputs[output]
            .try_extract_array::<f32>()
            .map_err(ort_error)?;

        Ok(preds.iter().copied().collect())
    }
}
