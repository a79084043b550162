use crate::{
    error::{ClassifierError, Result},
    file::ConfigFile,
    labels::ClassLabels,
    processor::TensorLayout,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Side length of the square input the fruit model was trained on.
pub const DEFAULT_INPUT_SIZE: u32 = 177;

/// Describes the tensor a model expects and the labels its output maps to.
///
/// Every field is optional in the JSON form; missing fields fall back to the
/// defaults of the bundled fruit model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub input_size: Vec<u32>, // [channels, height, width]
    pub layout: TensorLayout,
    pub input_name: Option<String>,
    pub output_name: Option<String>,
    pub labels: Option<Vec<String>>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_size: vec![3, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE],
            layout: TensorLayout::RowMajor,
            input_name: None,
            output_name: None,
            labels: None,
        }
    }
}

impl ClassifierConfig {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let json = fs::read_to_string(config_path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClassifierConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_pretrained(repo_id: &str) -> Result<Self> {
        let config_file = ConfigFile::new(repo_id).get().await?;
        Self::load(config_file)
    }

    /// Checks that `input_size` describes a three channel image with non-zero sides.
    pub fn validate(&self) -> Result<()> {
        match self.input_size.as_slice() {
            [3, h, w] if *h > 0 && *w > 0 => Ok(()),
            [c, _, _] if *c != 3 => Err(ClassifierError::Config(format!(
                "expected 3 input channels, got {}",
                c
            ))),
            [_, _, _] => Err(ClassifierError::Config(
                "input height and width must be non-zero".to_string(),
            )),
            other => Err(ClassifierError::Config(format!(
                "input_size must be [channels, height, width], got {:?}",
                other
            ))),
        }
    }

    /// Returns `(height, width)` of the model input.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        self.validate()?;
        Ok((self.input_size[1], self.input_size[2]))
    }

    /// Builds the label set, preferring labels embedded in the config.
    pub fn class_labels(&self) -> Result<ClassLabels> {
        match &self.labels {
            Some(names) => ClassLabels::new(names.clone()),
            None => Ok(ClassLabels::default()),
        }
    }
}
