use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a single image file
    Classify {
        /// The image to classify
        #[arg(short, long)]
        image: PathBuf,

        /// Path to a local ONNX model
        #[arg(short, long, default_value = "model.onnx", conflicts_with = "repo")]
        model: PathBuf,

        /// Hugging Face repository holding model.onnx, config.json and labels.csv
        #[arg(long)]
        repo: Option<String>,

        /// JSON file describing the model input and labels
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV file with an `index,name` header
        #[arg(short, long)]
        labels: Option<PathBuf>,

        /// List classes by descending probability instead of label order
        #[arg(long)]
        sorted: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}
