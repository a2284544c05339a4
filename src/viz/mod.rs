//! Post-training visualization suite.
//!
//! Renders loss curves, validation fit, attention weight profiles and error
//! distributions as SVG files under the output directory. With `show` enabled
//! each chart is also printed to the terminal in ASCII.

pub mod chart;

use std::fs;
use std::path::PathBuf;

use candle_core::Device;
use tracing::{info, warn};

use crate::data::WindowDataset;
use crate::error::{Result, WattcastError};
use crate::eval::{error_percentage_series, smape_series, SeriesSummary};
use crate::model::ForecastModel;
use crate::trainer::TrainReport;

use chart::{Histogram, LineChart, Marker, ScatterChart, Series};

/// Maximum individual attention curves drawn on the per-sample chart.
const MAX_ATTENTION_SAMPLES: usize = 5;

/// Flattened validation outputs collected in a single inference pass.
#[derive(Debug, Clone)]
pub struct ValOutputs {
    pub predictions: Vec<f32>,
    pub targets: Vec<f32>,
    /// Attention weights of the first validation batch, one row per sample.
    pub attention: Vec<Vec<f32>>,
}

/// Run the model over the validation set once, collecting predictions,
/// targets and first-batch attention weights.
pub fn collect_validation<M: ForecastModel>(
    model: &M,
    data: &WindowDataset,
    batch_size: usize,
    device: &Device,
) -> Result<ValOutputs> {
    let mut predictions = Vec::with_capacity(data.len());
    let mut targets = Vec::with_capacity(data.len());
    let mut attention = Vec::new();

    for (i, batch) in data.batches(batch_size, false, 0, device)?.enumerate() {
        let (inputs, batch_targets) = batch?;
        let output = model.forward_t(&inputs, false)?;
        predictions.extend(output.flatten_all()?.to_vec1::<f32>()?);
        targets.extend(batch_targets.flatten_all()?.to_vec1::<f32>()?);
        if i == 0 {
            attention = model.attention_weights(&inputs)?.to_vec2::<f32>()?;
        }
    }

    Ok(ValOutputs {
        predictions,
        targets,
        attention,
    })
}

/// Renders the full chart suite to an output directory.
pub struct VizSuite {
    out_dir: PathBuf,
    /// Also print ASCII renditions to stdout.
    show: bool,
}

impl VizSuite {
    pub fn new(out_dir: impl Into<PathBuf>, show: bool) -> Self {
        Self {
            out_dir: out_dir.into(),
            show,
        }
    }

    /// Render every chart. Returns the paths written.
    pub fn render_all(&self, report: &TrainReport, outputs: &ValOutputs) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.out_dir)?;
        let mut written = Vec::new();

        if let Some(path) = self.training_history(report)? {
            written.push(path);
        }
        written.push(self.val_predictions(outputs)?);
        written.push(self.perfect_prediction(outputs)?);
        written.push(self.attention_weights(outputs)?);
        written.push(self.average_attention_weights(outputs)?);
        written.extend(self.error_percentage(outputs)?);
        written.extend(self.smape(outputs)?);

        info!(count = written.len(), dir = %self.out_dir.display(), "charts written");
        Ok(written)
    }

    fn write_chart(&self, name: &str, svg: String, ascii: String) -> Result<PathBuf> {
        let path = self.out_dir.join(name);
        fs::write(&path, svg).map_err(|e| {
            WattcastError::Viz(format!("failed to write {}: {}", path.display(), e))
        })?;
        if self.show {
            println!("{}", ascii);
        }
        Ok(path)
    }

    /// Two-panel loss history: both curves on top, validation alone below.
    /// Skipped when no epochs ran.
    pub fn training_history(&self, report: &TrainReport) -> Result<Option<PathBuf>> {
        if report.train_losses.is_empty() {
            warn!("no epochs recorded, skipping training history chart");
            return Ok(None);
        }
        let mut both = LineChart::new("Training History", "epoch", "MSE loss");
        both.add_series(Series::from_values("train loss", &report.train_losses));
        both.add_series(Series::from_values("val loss", &report.val_losses));
        let mut val_only = LineChart::new("Validation Loss", "epoch", "MSE loss");
        val_only.add_series(Series::from_values("val loss", &report.val_losses));

        let svg = chart::stack_vertical(&both.render_svg(), &val_only.render_svg());
        let ascii = format!("{}\n{}", both.render_ascii(), val_only.render_ascii());
        let path = self.write_chart("training_history.svg", svg, ascii)?;
        Ok(Some(path))
    }

    /// Predicted and actual values over the validation samples.
    pub fn val_predictions(&self, outputs: &ValOutputs) -> Result<PathBuf> {
        let mut chart = LineChart::new("Validation Predictions", "sample", "power demand");
        chart.add_series(Series::from_values("actual", &outputs.targets));
        chart.add_series(Series::from_values("predicted", &outputs.predictions));
        self.write_chart("val_predictions.svg", chart.render_svg(), chart.render_ascii())
    }

    /// Actual vs predicted scatter with the identity diagonal.
    pub fn perfect_prediction(&self, outputs: &ValOutputs) -> Result<PathBuf> {
        let points: Vec<(f32, f32)> = outputs
            .targets
            .iter()
            .zip(outputs.predictions.iter())
            .map(|(&a, &p)| (a, p))
            .collect();
        let chart = ScatterChart::new("Perfect Prediction", "actual", "predicted", points)
            .with_diagonal();
        self.write_chart("perfect_prediction.svg", chart.render_svg(), chart.render_ascii())
    }

    /// Attention curves for the first few validation samples, peaks annotated.
    pub fn attention_weights(&self, outputs: &ValOutputs) -> Result<PathBuf> {
        let mut chart = LineChart::new("Attention Weights", "time step", "weight");
        for (i, row) in outputs
            .attention
            .iter()
            .take(MAX_ATTENTION_SAMPLES)
            .enumerate()
        {
            chart.add_series(Series::from_values(format!("sample {}", i), row));
            if let Some((step, &weight)) = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
            {
                chart.add_marker(Marker {
                    x: step as f32,
                    y: weight,
                    label: format!("t={}", step),
                });
            }
        }
        self.write_chart("attention_weights.svg", chart.render_svg(), chart.render_ascii())
    }

    /// Attention weights averaged over the batch, top steps annotated.
    pub fn average_attention_weights(&self, outputs: &ValOutputs) -> Result<PathBuf> {
        let mean = mean_attention(&outputs.attention);
        let mut chart = LineChart::new("Average Attention Weights", "time step", "mean weight");
        chart.add_series(Series::from_values("batch mean", &mean));

        let mut ranked: Vec<(usize, f32)> =
            mean.iter().cloned().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for &(step, weight) in ranked.iter().take(5) {
            chart.add_marker(Marker {
                x: step as f32,
                y: weight,
                label: format!("t={} ({:.4})", step, weight),
            });
            info!(step, weight, "high average attention");
        }
        self.write_chart(
            "average_attention_weights.svg",
            chart.render_svg(),
            chart.render_ascii(),
        )
    }

    /// Signed percentage error line chart and histogram.
    pub fn error_percentage(&self, outputs: &ValOutputs) -> Result<Vec<PathBuf>> {
        let errors = error_percentage_series(&outputs.predictions, &outputs.targets);
        let summary = SeriesSummary::from_values(&errors);
        info!(
            mean = summary.mean,
            std = summary.std,
            max = summary.max,
            min = summary.min,
            "error percentage summary"
        );

        let mut line = LineChart::new("Prediction Error", "sample", "error %");
        line.add_series(Series::from_values("error %", &errors));
        let line_path =
            self.write_chart("error_percentage_line.svg", line.render_svg(), line.render_ascii())?;

        let hist = Histogram::new("Prediction Error Distribution", "error %", errors);
        let hist_path = self.write_chart(
            "error_percentage_histogram.svg",
            hist.render_svg(),
            hist.render_ascii(),
        )?;
        Ok(vec![line_path, hist_path])
    }

    /// sMAPE line chart and histogram.
    pub fn smape(&self, outputs: &ValOutputs) -> Result<Vec<PathBuf>> {
        let values = smape_series(&outputs.predictions, &outputs.targets);
        let summary = SeriesSummary::from_values(&values);
        info!(
            mean = summary.mean,
            std = summary.std,
            max = summary.max,
            min = summary.min,
            "sMAPE summary"
        );

        let mut line = LineChart::new("sMAPE", "sample", "sMAPE");
        line.add_series(Series::from_values("sMAPE", &values));
        let line_path = self.write_chart("sMAPE_line.svg", line.render_svg(), line.render_ascii())?;

        let hist = Histogram::new("sMAPE Distribution", "sMAPE", values);
        let hist_path =
            self.write_chart("sMAPE_histogram.svg", hist.render_svg(), hist.render_ascii())?;
        Ok(vec![line_path, hist_path])
    }
}

/// Column-wise mean of attention rows. Empty input yields an empty curve.
fn mean_attention(rows: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0f32; first.len()];
    for row in rows {
        for (acc, &v) in mean.iter_mut().zip(row.iter()) {
            *acc += v;
        }
    }
    let n = rows.len() as f32;
    for v in &mut mean {
        *v /= n;
    }
    mean
}
