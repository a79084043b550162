pub use crate::{
    classifier::{classify, ClassifierModel, Device, InferenceEngine},
    config::ClassifierConfig,
    error::{ClassifierError, Result},
    labels::{ClassLabel, ClassLabels, FRUIT_LABELS},
    pipeline::{ClassificationPipeline, ClassifierService, Outcome, ProgressCallback},
    processor::{preprocess, ImagePreprocessor, ImageProcessor, TensorLayout},
    ranking::{rank, Prediction, ProbabilityVector, Ranking},
    render::{format_percentage, render_ranking, GENERIC_FAILURE_MESSAGE},
};
