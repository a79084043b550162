//! This module provides tools for preprocessing images before they are fed into a model.
//!
//! It defines the `ImageProcessor` trait for generic image processing operations
//! and provides a concrete implementation, `ImagePreprocessor`, which stretches the
//! image to the model's input size, scales channel values to `[0, 1]` and lays
//! them out channel-planar as a `[1, 3, H, W]` tensor.

use image::{
    imageops::{self, FilterType},
    DynamicImage, RgbImage,
};
use ndarray::{Array, Ix4};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{ClassifierConfig, DEFAULT_INPUT_SIZE},
    error::{ClassifierError, Result},
};

/// How row and column are combined into an offset within one channel plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// `row * W + col`, the usual NCHW ordering.
    #[default]
    RowMajor,
    /// `col * H + row`, for models exported with transposed planes.
    ///
    /// The tensor is then shaped `[1, 3, W, H]`.
    ColumnMajor,
}

impl TensorLayout {
    /// Offset of `(row, col)` inside a plane of `height` x `width` values.
    #[inline]
    pub fn plane_offset(&self, row: usize, col: usize, height: usize, width: usize) -> usize {
        match self {
            TensorLayout::RowMajor => row * width + col,
            TensorLayout::ColumnMajor => col * height + row,
        }
    }
}

/// A trait for processing images into tensors suitable for model input.
pub trait ImageProcessor {
    /// Processes a single image into a 4D tensor.
    fn process(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>>;
}

/// A preprocessor that resizes and normalizes images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreprocessor {
    pub height: u32,
    pub width: u32,
    pub layout: TensorLayout,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE, TensorLayout::RowMajor)
    }
}

impl ImagePreprocessor {
    /// Creates a new `ImagePreprocessor`.
    pub fn new(height: u32, width: u32, layout: TensorLayout) -> Self {
        Self {
            height,
            width,
            layout,
        }
    }

    /// Creates a preprocessor matching a `ClassifierConfig`.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let (height, width) = config.dimensions()?;
        Ok(Self::new(height, width, config.layout))
    }

    /// Shape of the tensor produced for one image: `[1, 3, H, W]`, or
    /// `[1, 3, W, H]` for `TensorLayout::ColumnMajor`.
    pub fn tensor_shape(&self) -> (usize, usize, usize, usize) {
        let (height, width) = (self.height as usize, self.width as usize);
        match self.layout {
            TensorLayout::RowMajor => (1, 3, height, width),
            TensorLayout::ColumnMajor => (1, 3, width, height),
        }
    }

    /// Number of values in the tensor produced for one image.
    pub fn tensor_len(&self) -> usize {
        3 * self.height as usize * self.width as usize
    }

    /// Drops alpha and stretches the image to exactly `width` x `height`, ignoring aspect ratio.
    fn resize(&self, image: &DynamicImage) -> RgbImage {
        let rgb = image.to_rgb8();
        if rgb.dimensions() == (self.width, self.height) {
            return rgb;
        }
        imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
    }

    /// Normalizes the pixel values and arranges them in the required tensor format.
    fn normalize_and_to_tensor(&self, image: &RgbImage) -> Result<Array<f32, Ix4>> {
        let (height, width) = (self.height as usize, self.width as usize);
        let plane = height * width;
        let mut buffer = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in image.enumerate_pixels() {
            let offset = self
                .layout
                .plane_offset(y as usize, x as usize, height, width);
            for (c, value) in pixel.0.iter().enumerate() {
                buffer[c * plane + offset] = *value as f32 / 255.0;
            }
        }

        Array::from_shape_vec(self.tensor_shape(), buffer)
            .map_err(|e| ClassifierError::Inference(format!("Failed to shape tensor: {}", e)))
    }
}

impl ImageProcessor for ImagePreprocessor {
    /// Resizes the image, drops any alpha channel and converts it into a normalized tensor.
    fn process(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>> {
        debug!(
            from_width = image.width(),
            from_height = image.height(),
            to_width = self.width,
            to_height = self.height,
            "preprocessing image"
        );
        let resized = self.resize(image);
        self.normalize_and_to_tensor(&resized)
    }
}

/// Converts `image` into a row-major `[1, 3, H, W]` tensor for a `(width, height)` input.
pub fn preprocess(image: &DynamicImage, target_size: (u32, u32)) -> Result<Array<f32, Ix4>> {
    let (width, height) = target_size;
    ImagePreprocessor::new(height, width, TensorLayout::RowMajor).process(image)
}
