use buah::{classifier::InferenceEngine, error::ClassifierError, error::Result};
use image::{ImageBuffer, Rgb, Rgba};
use ndarray::{Array, Ix4};
use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Once,
    },
};

#[allow(dead_code)]
static SETUP: Once = Once::new();

#[allow(dead_code)]
pub const RED_IMAGE: &str = "tests/assets/red_177.png";
#[allow(dead_code)]
pub const WIDE_IMAGE: &str = "tests/assets/wide_rgba.png";

#[allow(dead_code)]
fn generate_red_image(path: &Path) {
    let img = ImageBuffer::from_pixel(177, 177, Rgb([255u8, 0, 0]));
    img.save(path).unwrap();
}

#[allow(dead_code)]
fn generate_wide_image(path: &Path) {
    // Semi-transparent blue, wider than tall, to exercise alpha removal and stretching.
    let img = ImageBuffer::from_pixel(400, 120, Rgba([0u8, 0, 255, 64]));
    img.save(path).unwrap();
}

#[allow(dead_code)]
pub fn setup() {
    SETUP.call_once(|| {
        let assets_dir = Path::new("tests/assets");
        if !assets_dir.exists() {
            fs::create_dir_all(assets_dir).unwrap();
        }

        let red = Path::new(RED_IMAGE);
        if !red.exists() {
            generate_red_image(red);
        }
        let wide = Path::new(WIDE_IMAGE);
        if !wide.exists() {
            generate_wide_image(wide);
        }
    });
}

/// Probabilities used throughout the tests: `belimbing` at 60%.
#[allow(dead_code)]
pub fn belimbing_probs() -> Vec<f32> {
    vec![0.05, 0.05, 0.6, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05]
}

/// An engine that returns fixed probabilities and records what it was fed.
#[allow(dead_code)]
pub struct MockEngine {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub probabilities: Vec<f32>,
    pub fail_with: Option<String>,
    pub calls: Arc<AtomicUsize>,
    pub last_call: Option<(String, Vec<usize>, String)>,
    pub on_run: Option<Box<dyn Fn() + Send>>,
}

#[allow(dead_code)]
impl MockEngine {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self {
            inputs: vec!["input".to_string()],
            outputs: vec!["output".to_string()],
            probabilities,
            fail_with: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_call: None,
            on_run: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        let mut engine = Self::new(vec![]);
        engine.fail_with = Some(message.to_string());
        engine
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceEngine for MockEngine {
    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }

    fn run(&mut self, input: &str, tensor: Array<f32, Ix4>, output: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_call = Some((input.to_string(), tensor.shape().to_vec(), output.to_string()));
        if let Some(hook) = &self.on_run {
            hook();
        }
        match &self.fail_with {
            Some(message) => Err(ClassifierError::Inference(message.clone())),
            None => Ok(self.probabilities.clone()),
        }
    }
}
