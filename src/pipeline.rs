//! This module provides a high-level `ClassificationPipeline` for turning images into ranked classes.
//!
//! The pipeline combines an `ImagePreprocessor` and a `ClassLabels` set. The inference
//! engine is not owned by the pipeline: every call receives the session it should use,
//! and a missing session is reported as `ClassifierError::ModelNotLoaded`.
//!
//! `ClassifierService` wraps a pipeline and a loaded engine for front ends that may
//! submit a new image before the previous one finished. Requests are serialized on the
//! engine, and results of a request that was overtaken by a newer one are discarded.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use image::DynamicImage;
use ndarray::Array4;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    classifier::{classify_with_names, InferenceEngine},
    config::ClassifierConfig,
    error::{ClassifierError, Result},
    labels::ClassLabels,
    processor::{ImagePreprocessor, ImageProcessor},
    ranking::{rank, ProbabilityVector, Ranking},
};

/// A callback function for reporting progress.
///
/// The first argument is the progress percentage (0.0 to 1.0), and the second
/// is a status message.
pub type ProgressCallback = Box<dyn Fn(f32, String) + Send + Sync>;

/// An end-to-end pipeline for single-image classification.
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    /// The preprocessor for preparing images.
    pub preprocessor: ImagePreprocessor,
    /// The labels, index-aligned with the model output.
    pub labels: ClassLabels,
    /// Overrides the model's first declared input name.
    pub input_name: Option<String>,
    /// Overrides the model's first declared output name.
    pub output_name: Option<String>,
}

impl Default for ClassificationPipeline {
    fn default() -> Self {
        Self::new(ImagePreprocessor::default(), ClassLabels::default())
    }
}

impl ClassificationPipeline {
    /// Creates a new `ClassificationPipeline`.
    pub fn new(preprocessor: ImagePreprocessor, labels: ClassLabels) -> Self {
        Self {
            preprocessor,
            labels,
            input_name: None,
            output_name: None,
        }
    }

    /// Creates a pipeline from a `ClassifierConfig`.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            preprocessor: ImagePreprocessor::from_config(config)?,
            labels: config.class_labels()?,
            input_name: config.input_name.clone(),
            output_name: config.output_name.clone(),
        })
    }

    /// Replaces the label set.
    pub fn with_labels(mut self, labels: ClassLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Reports progress using the provided callback.
    fn report_progress(progress_callback: Option<&ProgressCallback>, progress: f32, message: &str) {
        if let Some(cb) = progress_callback {
            cb(progress, message.to_string());
        }
    }

    fn infer<E>(&self, tensor: Array4<f32>, session: Option<&mut E>) -> Result<ProbabilityVector>
    where
        E: InferenceEngine + ?Sized,
    {
        classify_with_names(
            tensor,
            session,
            self.input_name.as_deref(),
            self.output_name.as_deref(),
        )
    }

    /// Checks once, before serving requests, that the engine emits one value per label.
    ///
    /// A blank tensor of the configured shape is run through the engine and the
    /// length of its output compared with the label set.
    pub fn validate<E>(&self, engine: &mut E) -> Result<()>
    where
        E: InferenceEngine + ?Sized,
    {
        let tensor = Array4::zeros(self.preprocessor.tensor_shape());
        let probs = self.infer(tensor, Some(engine))?;
        self.labels.validate_output_len(probs.len())?;
        info!(classes = self.labels.len(), "model output matches label set");
        Ok(())
    }

    /// Classifies a decoded image.
    pub fn classify_image<E>(
        &self,
        image: &DynamicImage,
        session: Option<&mut E>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Ranking>
    where
        E: InferenceEngine + ?Sized,
    {
        let progress_callback = progress_callback.as_ref();

        Self::report_progress(progress_callback, 0.0, "Preprocessing image...");
        let tensor = self.preprocessor.process(image)?;

        Self::report_progress(progress_callback, 0.4, "Running model prediction...");
        let probs = self.infer(tensor, session)?;

        Self::report_progress(progress_callback, 0.8, "Processing results...");
        let ranking = rank(&probs, &self.labels)?;
        debug!(label = %ranking.top.label, probability = ranking.top.probability, "top prediction");

        Self::report_progress(progress_callback, 1.0, "Prediction complete.");
        Ok(ranking)
    }

    /// Reads, decodes and classifies the image file at `path`.
    ///
    /// Nothing is read when `session` is `None`.
    pub async fn classify_file<E, P>(
        &self,
        path: P,
        session: Option<&mut E>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Ranking>
    where
        E: InferenceEngine + ?Sized,
        P: AsRef<Path>,
    {
        let session = session.ok_or(ClassifierError::ModelNotLoaded)?;
        let image = load_image(path).await?;
        self.classify_image(&image, Some(session), progress_callback)
    }
}

/// Reads an image file and decodes it off the async runtime.
pub async fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading image");
    let bytes = tokio::fs::read(path).await?;
    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
    Ok(image)
}

/// Identifies one submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Hands out increasing tickets; only the most recent one is current.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request, superseding every earlier one.
    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// What became of a submitted request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Ranking),
    /// A newer request was submitted before this one finished; its result was dropped.
    Superseded,
}

/// A shareable front door to one pipeline and one loaded engine.
pub struct ClassifierService<E> {
    pipeline: Arc<ClassificationPipeline>,
    session: Arc<Mutex<Option<E>>>,
    tracker: RequestTracker,
}

impl<E> Clone for ClassifierService<E> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            session: Arc::clone(&self.session),
            tracker: self.tracker.clone(),
        }
    }
}

impl<E> ClassifierService<E>
where
    E: InferenceEngine + Send,
{
    /// Creates a service without checking the engine against the labels.
    pub fn new(pipeline: ClassificationPipeline, session: Option<E>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            session: Arc::new(Mutex::new(session)),
            tracker: RequestTracker::new(),
        }
    }

    /// Validates `engine` against the pipeline's labels and creates the service.
    pub fn start(pipeline: ClassificationPipeline, mut engine: E) -> Result<Self> {
        pipeline.validate(&mut engine)?;
        Ok(Self::new(pipeline, Some(engine)))
    }

    pub fn pipeline(&self) -> &ClassificationPipeline {
        &self.pipeline
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Classifies the image file at `path` unless a newer request overtakes it.
    pub async fn submit<P: AsRef<Path>>(&self, path: P) -> Result<Outcome> {
        let ticket = self.tracker.begin();
        let image = load_image(path).await;
        if !self.tracker.is_current(ticket) {
            warn!(?ticket, "request superseded while reading the image");
            return Ok(Outcome::Superseded);
        }
        self.run(ticket, image?).await
    }

    /// Classifies an already decoded image unless a newer request overtakes it.
    pub async fn submit_image(&self, image: DynamicImage) -> Result<Outcome> {
        let ticket = self.tracker.begin();
        self.run(ticket, image).await
    }

    async fn run(&self, ticket: Ticket, image: DynamicImage) -> Result<Outcome> {
        if !self.tracker.is_current(ticket) {
            warn!(?ticket, "request superseded before inference");
            return Ok(Outcome::Superseded);
        }

        let mut session = self.session.lock().await;
        if !self.tracker.is_current(ticket) {
            warn!(?ticket, "request superseded while waiting for the model");
            return Ok(Outcome::Superseded);
        }

        let ranking = self
            .pipeline
            .classify_image(&image, (*session).as_mut(), None);
        drop(session);

        // Stale requests are dropped whether they succeeded or failed.
        if !self.tracker.is_current(ticket) {
            warn!(?ticket, "discarding result of superseded request");
            return Ok(Outcome::Superseded);
        }
        Ok(Outcome::Completed(ranking?))
    }
}
