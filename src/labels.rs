use crate::{
    error::{ClassifierError, Result},
    file::LabelCSVFile,
};
use serde::Deserialize;
use std::path::Path;

/// Labels of the bundled fruit model, in model output order.
#[rustfmt::skip]
pub const FRUIT_LABELS: [&str; 10] = [
    "anggur",
    "apel",
    "belimbing",
    "jeruk",
    "kiwi",
    "mangga",
    "nanas",
    "pisang",
    "semangka",
    "stroberi",
];

/// Each record in the CSV file, and each entry of a `ClassLabels` set.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClassLabel {
    index: usize,
    name: String,
}

impl ClassLabel {
    pub fn new<S: Into<String>>(index: usize, name: S) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered class labels, index-aligned with the model output.
///
/// Position `i` always holds the label whose `index` is `i`; constructors
/// reject anything else so the alignment never has to be assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
    labels: Vec<ClassLabel>,
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self {
            labels: FRUIT_LABELS
                .iter()
                .enumerate()
                .map(|(index, name)| ClassLabel::new(index, *name))
                .collect(),
        }
    }
}

impl ClassLabels {
    /// Creates a label set from names given in output order.
    pub fn new<S: Into<String>>(names: Vec<S>) -> Result<Self> {
        let labels = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| ClassLabel::new(index, name))
            .collect();
        Self::from_labels(labels)
    }

    /// Creates a label set from explicit `(index, name)` pairs in any order.
    ///
    /// Indices must cover `0..n` exactly once and names must be non-empty.
    pub fn from_labels(mut labels: Vec<ClassLabel>) -> Result<Self> {
        if labels.is_empty() {
            return Err(ClassifierError::InvalidLabels(
                "label set is empty".to_string(),
            ));
        }

        labels.sort_by_key(|l| l.index);
        for (position, label) in labels.iter().enumerate() {
            if label.index != position {
                return Err(ClassifierError::InvalidLabels(format!(
                    "expected label index {}, found {} ({})",
                    position, label.index, label.name
                )));
            }
            if label.name.trim().is_empty() {
                return Err(ClassifierError::InvalidLabels(format!(
                    "label {} has an empty name",
                    label.index
                )));
            }
        }

        Ok(Self { labels })
    }

    /// Load from a local CSV file with an `index,name` header.
    pub fn load<P: AsRef<Path>>(csv_path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(csv_path.as_ref())?;
        let labels = reader
            .deserialize()
            .collect::<std::result::Result<Vec<ClassLabel>, _>>()?;
        Self::from_labels(labels)
    }

    pub async fn from_pretrained(repo_id: &str) -> Result<Self> {
        let csv_path = LabelCSVFile::new(repo_id).get().await?;
        Self::load(csv_path)
    }

    /// Fails with `LabelMismatch` unless the model emits one value per label.
    pub fn validate_output_len(&self, probabilities: usize) -> Result<()> {
        if probabilities != self.labels.len() {
            return Err(ClassifierError::LabelMismatch {
                probabilities,
                labels: self.labels.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClassLabel> {
        self.labels.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassLabel> {
        self.labels.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name()).collect()
    }
}
