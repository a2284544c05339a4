//! End-to-end training loop behavior.

use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use tempfile::TempDir;

use wattcast::checkpoint;
use wattcast::metrics::NullMetricsSink;
use wattcast::model::{AttentionRegressor, ForecastModel};
use wattcast::trainer::{TrainOutcome, Trainer, TrainerOptions};
use wattcast::WindowDataset;

fn demand_series(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 100.0 + 20.0 * (i as f32 * std::f32::consts::TAU / 24.0).sin())
        .collect()
}

fn datasets(seq_len: usize) -> (WindowDataset, WindowDataset) {
    let series = demand_series(120);
    let train = WindowDataset::from_series(&series[..seq_len + 64], seq_len);
    let val = WindowDataset::from_series(&series[80..], seq_len);
    assert_eq!(train.len(), 64);
    (train, val)
}

fn make_trainer(batch_size: usize) -> Trainer<AttentionRegressor> {
    let (train, val) = datasets(8);
    let model = AttentionRegressor::new(1, 16, 0.0, &Device::Cpu).unwrap();
    let options = TrainerOptions {
        batch_size,
        device: Some(Device::Cpu),
        show_progress: false,
        ..Default::default()
    };
    Trainer::new(model, train, val, options, Box::new(NullMetricsSink)).unwrap()
}

#[test]
fn full_run_completes_and_writes_checkpoint() {
    let dir = TempDir::new().unwrap();
    let ckpt = dir.path().join("checkpoint");
    let mut trainer = make_trainer(32);

    let report = trainer.train(3, &ckpt, 2, 0).unwrap();

    assert_eq!(report.outcome, TrainOutcome::Completed);
    assert_eq!(report.train_losses.len(), 3);
    assert_eq!(report.val_losses.len(), 3);
    assert!(ckpt.join("training_state.json").exists());
    assert!(ckpt.join("model.safetensors").exists());

    let state = checkpoint::read_state(&ckpt).unwrap().unwrap();
    assert!(state.epoch < 3);
    assert_eq!(state.val_loss, trainer.best_val_loss());
}

/// Model with no trainable parameters; predicts the window mean, so its
/// validation loss never changes between epochs.
struct WindowMean {
    varmap: VarMap,
}

impl ForecastModel for WindowMean {
    fn forward_t(&self, xs: &Tensor, _train: bool) -> candle_core::Result<Tensor> {
        xs.mean(1)
    }

    fn attention_weights(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq, _) = xs.dims3()?;
        Tensor::full(1.0 / seq as f32, (batch, seq), xs.device())
    }

    fn varmap(&self) -> &VarMap {
        &self.varmap
    }
}

#[test]
fn epoch_losses_are_means_of_per_batch_mse() {
    let (train, val) = datasets(8);
    let device = Device::Cpu;

    // Hand-computed per-batch MSE for the window-mean prediction, over the
    // same batch orders the trainer uses (seeded shuffle for the training
    // pass at epoch 0, sample order for validation). Batch size 20 leaves
    // unequal final batches on both splits.
    let per_batch_mse = |data: &WindowDataset, shuffle: bool, seed: u64| -> Vec<f32> {
        data.batches(20, shuffle, seed, &device)
            .unwrap()
            .map(|batch| {
                let (inputs, targets) = batch.unwrap();
                let preds = inputs.mean(1).unwrap();
                (preds - targets)
                    .unwrap()
                    .sqr()
                    .unwrap()
                    .mean_all()
                    .unwrap()
                    .to_scalar::<f32>()
                    .unwrap()
            })
            .collect()
    };
    let train_losses = per_batch_mse(&train, true, 42);
    let val_losses = per_batch_mse(&val, false, 0);
    let expected_train = train_losses.iter().sum::<f32>() / train_losses.len() as f32;
    let expected_val = val_losses.iter().sum::<f32>() / val_losses.len() as f32;

    let options = TrainerOptions {
        batch_size: 20,
        device: Some(device),
        show_progress: false,
        ..Default::default()
    };
    let model = WindowMean {
        varmap: VarMap::new(),
    };
    let mut trainer =
        Trainer::new(model, train, val, options, Box::new(NullMetricsSink)).unwrap();

    assert!((trainer.train_epoch(0).unwrap() - expected_train).abs() < 1e-6);
    assert!((trainer.validate().unwrap() - expected_val).abs() < 1e-6);
}

#[test]
fn constant_val_loss_stops_early_with_one_checkpoint() {
    let dir = TempDir::new().unwrap();
    let ckpt = dir.path().join("checkpoint");
    let (train, val) = datasets(8);
    let model = WindowMean {
        varmap: VarMap::new(),
    };
    let options = TrainerOptions {
        batch_size: 32,
        device: Some(Device::Cpu),
        show_progress: false,
        ..Default::default()
    };
    let mut trainer =
        Trainer::new(model, train, val, options, Box::new(NullMetricsSink)).unwrap();

    let report = trainer.train(10, &ckpt, 2, 0).unwrap();

    // Epoch 0 improves on infinity; epochs 1 and 2 exhaust patience 2.
    assert_eq!(report.outcome, TrainOutcome::EarlyStopped { epoch: 2 });
    assert_eq!(report.val_losses.len(), 3);
    assert_eq!(report.val_losses[0], report.val_losses[1]);
    let state = checkpoint::read_state(&ckpt).unwrap().unwrap();
    assert_eq!(state.epoch, 0);
}

#[test]
fn resume_restores_epoch_and_learning_rate() {
    let dir = TempDir::new().unwrap();
    let ckpt = dir.path().join("checkpoint");

    let mut first = make_trainer(32);
    first.train(2, &ckpt, 5, 0).unwrap();
    let saved = checkpoint::read_state(&ckpt).unwrap().unwrap();

    let mut second = make_trainer(32);
    let start_epoch = second.restore(&ckpt).unwrap();
    assert_eq!(start_epoch, saved.epoch + 1);
    assert_eq!(second.learning_rate(), saved.learning_rate);

    // Validation is deterministic, so reproducing the checkpointed loss
    // exactly means the saved weights replaced the fresh initialization.
    assert_eq!(second.validate().unwrap(), saved.val_loss);

    // Continuing from the restored epoch runs only the remaining epochs.
    let report = second.train(start_epoch + 1, &ckpt, 5, start_epoch).unwrap();
    assert_eq!(report.train_losses.len(), 1);
}

#[test]
fn resume_from_empty_dir_starts_at_zero() {
    let dir = TempDir::new().unwrap();
    let mut trainer = make_trainer(32);
    assert_eq!(trainer.restore(&dir.path().join("nope")).unwrap(), 0);
}

#[test]
fn partial_final_batch_is_trained() {
    // 64 samples at batch 24 leave a final batch of 16.
    let dir = TempDir::new().unwrap();
    let mut trainer = make_trainer(24);
    let report = trainer.train(1, &dir.path().join("ckpt"), 5, 0).unwrap();
    assert_eq!(report.train_losses.len(), 1);
    assert!(report.train_losses[0].is_finite());
}
