//! Turning raw model output into labelled predictions.
//!
//! `rank` pairs each probability with its label, keeping label order, and
//! picks the top-1 prediction separately using first-maximum semantics.

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    error::{ClassifierError, Result},
    labels::ClassLabels,
};

/// Per-class probabilities in model output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityVector(Vec<f32>);

impl ProbabilityVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the largest value; the lowest index wins ties and `NaN` never wins.
    pub fn argmax(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .fold(None, |best: Option<(usize, f32)>, (i, &p)| match best {
                Some((_, max)) if p <= max => best,
                _ => Some((i, p)),
            })
            .map(|(i, _)| i)
    }
}

impl From<Vec<f32>> for ProbabilityVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// A single class with its probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub probability: f32,
}

impl Prediction {
    pub fn percentage(&self) -> f32 {
        self.probability * 100.0
    }
}

/// All predictions in label order, plus the most likely one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub predictions: Vec<Prediction>,
    pub top: Prediction,
}

impl Ranking {
    /// Predictions by descending probability; equal probabilities keep label order.
    pub fn sorted(&self) -> Vec<&Prediction> {
        self.predictions
            .iter()
            .sorted_by(|a, b| {
                b.probability
                    .partial_cmp(&a.probability)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .collect()
    }

    /// Label to probability, in label order.
    pub fn to_map(&self) -> IndexMap<String, f32> {
        self.predictions
            .iter()
            .map(|p| (p.label.clone(), p.probability))
            .collect()
    }
}

/// Pairs `probs` with `labels` and selects the top-1 prediction.
pub fn rank(probs: &ProbabilityVector, labels: &ClassLabels) -> Result<Ranking> {
    labels.validate_output_len(probs.len())?;

    let predictions: Vec<Prediction> = labels
        .iter()
        .zip(probs.as_slice())
        .map(|(label, &probability)| Prediction {
            index: label.index(),
            label: label.name().to_string(),
            probability,
        })
        .collect();

    let top = probs
        .argmax()
        .and_then(|i| predictions.get(i))
        .cloned()
        .ok_or(ClassifierError::EmptyOutput)?;

    Ok(Ranking { predictions, top })
}
