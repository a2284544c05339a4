//! Training loop.
//!
//! Runs the epoch/validation cycle with gradient clipping, plateau LR
//! scheduling, best-checkpoint saving and early stopping.

use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::loss;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::checkpoint::{self, Checkpoint};
use crate::data::WindowDataset;
use crate::early_stopping::{EarlyStopping, StoppingDecision};
use crate::error::{Result, WattcastError};
use crate::metrics::MetricsSink;
use crate::model::ForecastModel;
use crate::optimizer::{AdamWOptimizer, OptimizerConfig};
use crate::scheduler::ReduceOnPlateau;

/// Global gradient norm ceiling applied every optimizer step.
const MAX_GRAD_NORM: f32 = 1.0;

/// Pick the best available device: CUDA, then Metal, then CPU.
pub fn select_device() -> Result<Device> {
    if candle_core::utils::cuda_is_available() {
        Ok(Device::new_cuda(0)?)
    } else if candle_core::utils::metal_is_available() {
        Ok(Device::new_metal(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

/// Knobs for a training run.
#[derive(Debug, Clone)]
pub struct TrainerOptions {
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Device override; `None` picks the best available.
    pub device: Option<Device>,
    pub show_progress: bool,
    pub quiet: bool,
    pub seed: u64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            learning_rate: 1e-4,
            device: None,
            show_progress: true,
            quiet: false,
            seed: 42,
        }
    }
}

/// How a training run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    /// All requested epochs ran.
    Completed,
    /// Early stopping fired at the given epoch.
    EarlyStopped { epoch: usize },
}

/// Loss histories and outcome of one `train` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub train_losses: Vec<f32>,
    pub val_losses: Vec<f32>,
    pub outcome: TrainOutcome,
}

/// Drives training and validation for any [`ForecastModel`].
pub struct Trainer<M: ForecastModel> {
    model: M,
    train_data: WindowDataset,
    val_data: WindowDataset,
    optimizer: AdamWOptimizer,
    scheduler: ReduceOnPlateau,
    sink: Box<dyn MetricsSink>,
    options: TrainerOptions,
    device: Device,
    best_val_loss: f32,
    train_losses: Vec<f32>,
    val_losses: Vec<f32>,
}

impl<M: ForecastModel> Trainer<M> {
    pub fn new(
        model: M,
        train_data: WindowDataset,
        val_data: WindowDataset,
        options: TrainerOptions,
        sink: Box<dyn MetricsSink>,
    ) -> Result<Self> {
        if train_data.is_empty() {
            return Err(WattcastError::Training(
                "training dataset is empty".to_string(),
            ));
        }
        let device = match &options.device {
            Some(device) => device.clone(),
            None => select_device()?,
        };
        let optimizer_config = OptimizerConfig {
            learning_rate: options.learning_rate,
            ..Default::default()
        };
        let optimizer = optimizer_config.build_adamw(model.varmap())?;
        let num_params: usize = model
            .varmap()
            .all_vars()
            .iter()
            .map(|v| v.elem_count())
            .sum();

        info!(
            device = ?device,
            train_samples = train_data.len(),
            val_samples = val_data.len(),
            parameters = num_params,
            "trainer initialized"
        );

        Ok(Self {
            model,
            train_data,
            val_data,
            optimizer,
            scheduler: ReduceOnPlateau::default(),
            sink,
            options,
            device,
            best_val_loss: f32::INFINITY,
            train_losses: Vec::new(),
            val_losses: Vec::new(),
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn val_data(&self) -> &WindowDataset {
        &self.val_data
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    pub fn best_val_loss(&self) -> f32 {
        self.best_val_loss
    }

    /// Per-epoch mean training losses accumulated across `train` calls.
    pub fn train_losses(&self) -> &[f32] {
        &self.train_losses
    }

    /// Per-epoch mean validation losses accumulated across `train` calls.
    pub fn val_losses(&self) -> &[f32] {
        &self.val_losses
    }

    pub fn learning_rate(&self) -> f64 {
        self.optimizer.learning_rate()
    }

    /// Restore model weights and learning rate from a checkpoint directory.
    ///
    /// Returns the epoch to resume from, or 0 when no checkpoint exists. The
    /// best-loss tracker is left untouched so a resumed run must earn its
    /// first checkpoint write again.
    pub fn restore(&mut self, dir: &Path) -> Result<usize> {
        let mut varmap = self.model.varmap().clone();
        match checkpoint::load(dir, &mut varmap, &mut self.optimizer)? {
            Some(state) => Ok(state.epoch + 1),
            None => Ok(0),
        }
    }

    fn batch_loss(&self, inputs: &Tensor, targets: &Tensor, train: bool) -> Result<Tensor> {
        let predictions = self.model.forward_t(inputs, train)?;
        Ok(loss::mse(&predictions, targets)?)
    }

    /// One pass over the training set with a fresh shuffle order.
    pub fn train_epoch(&mut self, epoch: usize) -> Result<f32> {
        let num_batches = self.train_data.num_batches(self.options.batch_size);
        let progress = self.epoch_progress(num_batches, epoch)?;

        let shuffle_seed = self.options.seed.wrapping_add(epoch as u64);
        let batches = self.train_data.batches(
            self.options.batch_size,
            true,
            shuffle_seed,
            &self.device,
        )?;

        let mut total_loss = 0.0f32;
        for batch in batches {
            let (inputs, targets) = batch?;
            let loss = self.batch_loss(&inputs, &targets, true)?;
            self.optimizer
                .step_clipped(&loss, self.model.varmap(), MAX_GRAD_NORM)?;
            let loss_value = loss.to_scalar::<f32>()?;
            total_loss += loss_value;
            if let Some(bar) = &progress {
                bar.set_message(format!("loss: {:.6}", loss_value));
                bar.inc(1);
            }
        }
        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }

        Ok(total_loss / num_batches as f32)
    }

    /// Mean MSE over the validation set, without gradient updates.
    pub fn validate(&self) -> Result<f32> {
        if self.val_data.is_empty() {
            return Err(WattcastError::Training(
                "validation dataset is empty".to_string(),
            ));
        }
        let num_batches = self.val_data.num_batches(self.options.batch_size);
        let batches =
            self.val_data
                .batches(self.options.batch_size, false, 0, &self.device)?;
        let mut total_loss = 0.0f32;
        for batch in batches {
            let (inputs, targets) = batch?;
            let loss = self.batch_loss(&inputs, &targets, false)?;
            total_loss += loss.to_scalar::<f32>()?;
        }
        Ok(total_loss / num_batches as f32)
    }

    /// Run the full training loop.
    ///
    /// Each epoch trains, validates, steps the LR scheduler and checks early
    /// stopping. A checkpoint is written to `save_path` whenever the
    /// validation loss improves on the best seen so far.
    pub fn train(
        &mut self,
        num_epochs: usize,
        save_path: &Path,
        patience: usize,
        start_epoch: usize,
    ) -> Result<TrainReport> {
        let mut stopper = EarlyStopping::with_best(patience, self.best_val_loss);
        let mut outcome = TrainOutcome::Completed;

        for epoch in start_epoch..num_epochs {
            let train_loss = self.train_epoch(epoch)?;
            let val_loss = self.validate()?;
            self.train_losses.push(train_loss);
            self.val_losses.push(val_loss);

            info!(
                epoch = epoch + 1,
                total = num_epochs,
                train_loss = format!("{:.6}", train_loss),
                val_loss = format!("{:.6}", val_loss),
                lr = self.optimizer.learning_rate(),
                "epoch complete"
            );
            self.sink.log_scalar("Loss/train", train_loss as f64, epoch)?;
            self.sink.log_scalar("Loss/val", val_loss as f64, epoch)?;

            if let Some(new_lr) = self.scheduler.step(val_loss, &mut self.optimizer) {
                info!(epoch = epoch + 1, new_lr, "reduced learning rate on plateau");
            }
            // Emitted after the scheduler so a reduction epoch records the new rate.
            self.sink
                .log_scalar("Learning_rate", self.optimizer.learning_rate(), epoch)?;

            match stopper.check(val_loss, epoch) {
                StoppingDecision::NewBest => {
                    self.best_val_loss = val_loss;
                    let state = Checkpoint {
                        epoch,
                        train_loss,
                        val_loss,
                        learning_rate: self.optimizer.learning_rate(),
                    };
                    checkpoint::save(save_path, &state, self.model.varmap())?;
                }
                StoppingDecision::NoImprovement { count, remaining } => {
                    info!(count, remaining, "no validation improvement");
                }
                StoppingDecision::Stop => {
                    warn!(epoch = epoch + 1, "early stopping triggered");
                    outcome = TrainOutcome::EarlyStopped { epoch };
                    break;
                }
            }
        }

        Ok(TrainReport {
            train_losses: self.train_losses.clone(),
            val_losses: self.val_losses.clone(),
            outcome,
        })
    }

    fn epoch_progress(&self, num_batches: usize, epoch: usize) -> Result<Option<ProgressBar>> {
        if !self.options.show_progress || self.options.quiet {
            return Ok(None);
        }
        let bar = ProgressBar::new(num_batches as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        bar.set_prefix(format!("epoch {}", epoch + 1));
        Ok(Some(bar))
    }
}
