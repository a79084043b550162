//! Plain-text presentation of a `Ranking`.

use itertools::Itertools;

use crate::ranking::{Prediction, Ranking};

/// Shown to the user whenever a classification attempt fails.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Error classifying image. Please check the logs for details.";

const BAR_WIDTH: usize = 20;

/// Formats a probability as a percentage with two decimals, e.g. `60.00%`.
pub fn format_percentage(probability: f32) -> String {
    format!("{:.2}%", probability * 100.0)
}

fn bar(probability: f32) -> String {
    let filled = (probability.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn render_line(prediction: &Prediction, label_width: usize) -> String {
    format!(
        "{:<width$}  [{}]  {:>7}",
        prediction.label.to_uppercase(),
        bar(prediction.probability),
        format_percentage(prediction.probability),
        width = label_width,
    )
}

/// Renders one line per class followed by the most likely class.
pub fn render_predictions<'a, I>(predictions: I, top: &Prediction) -> String
where
    I: IntoIterator<Item = &'a Prediction>,
{
    let predictions: Vec<&Prediction> = predictions.into_iter().collect();
    let label_width = predictions
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);

    let lines = predictions
        .iter()
        .map(|p| render_line(p, label_width))
        .join("\n");

    format!(
        "{}\n\nMost likely class: {} with {}",
        lines,
        top.label.to_uppercase(),
        format_percentage(top.probability)
    )
}

/// Renders a ranking in label order.
pub fn render_ranking(ranking: &Ranking) -> String {
    render_predictions(&ranking.predictions, &ranking.top)
}
