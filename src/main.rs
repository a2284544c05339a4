use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wattcast::checkpoint;
use wattcast::config::WattcastConfig;
use wattcast::error::Result;
use wattcast::logging;
use wattcast::metrics::{JsonlMetricsWriter, MetricsSink, NullMetricsSink};
use wattcast::model::{AttentionRegressor, ForecastModel};
use wattcast::trainer::{select_device, TrainOutcome, TrainReport, Trainer, TrainerOptions};
use wattcast::viz::{collect_validation, VizSuite};
use wattcast::WindowDataset;

/// Input window length in time steps.
const SEQ_LEN: usize = 24;
/// Hidden width of the attention encoder.
const HIDDEN_SIZE: usize = 64;
/// Dropout applied to the pooled context during training.
const DROPOUT: f32 = 0.2;
/// Length of the generated demand series.
const SERIES_LEN: usize = 2000;

#[derive(Parser)]
#[command(name = "wattcast")]
#[command(about = "Power demand forecasting with an attention regressor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: String,
    },
    /// Write a default configuration file
    Init {
        /// Where to write the configuration
        #[arg(short, long, default_value = "wattcast.yaml")]
        path: String,
    },
    /// Train the model
    Train {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: String,
        /// Resume from the checkpoint in the output directory
        #[arg(long)]
        resume: bool,
        /// Print ASCII renditions of every chart to the terminal
        #[arg(long)]
        show: bool,
    },
    /// Render the chart suite from a saved checkpoint
    Report {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: String,
        /// Checkpoint directory
        #[arg(long)]
        checkpoint: String,
        /// Print ASCII renditions of every chart to the terminal
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => {
            let config = WattcastConfig::from_file(&config)?;
            config.validate()?;
            println!("✓ Configuration is valid");
            println!("  Epochs: {}", config.training.epochs);
            println!("  Batch size: {}", config.training.batch_size);
            println!("  Learning rate: {}", config.training.learning_rate);
            println!("  Output dir: {}", config.output_dir);
        }
        Commands::Init { path } => {
            let config = WattcastConfig::default();
            config.to_file(&path)?;
            println!("✓ Wrote default configuration to {}", path);
        }
        Commands::Train {
            config,
            resume,
            show,
        } => {
            let config = WattcastConfig::from_file(&config)?;
            config.validate()?;
            run_training(&config, resume, show)?;
        }
        Commands::Report {
            config,
            checkpoint,
            show,
        } => {
            let config = WattcastConfig::from_file(&config)?;
            config.validate()?;
            run_report(&config, Path::new(&checkpoint), show)?;
        }
    }

    Ok(())
}

fn run_training(config: &WattcastConfig, resume: bool, show: bool) -> Result<()> {
    let log_dir = PathBuf::from(&config.logging.log_dir);
    logging::init(
        config.training.quiet_mode,
        &log_dir.join(&config.logging.log_file),
    )?;

    let series = demand_series(SERIES_LEN, config.training.seed);
    let split = series.len() * 4 / 5;
    let train_data = WindowDataset::from_series(&series[..split], SEQ_LEN);
    let val_data = WindowDataset::from_series(&series[split..], SEQ_LEN);

    let device = select_device()?;
    let model = AttentionRegressor::new(1, HIDDEN_SIZE, DROPOUT, &device)?;

    let sink: Box<dyn MetricsSink> = if config.logging.tensorboard {
        Box::new(JsonlMetricsWriter::new(&log_dir)?)
    } else {
        Box::new(NullMetricsSink)
    };

    let options = TrainerOptions {
        batch_size: config.training.batch_size,
        learning_rate: config.training.learning_rate,
        device: Some(device),
        show_progress: config.training.show_progress,
        quiet: config.training.quiet_mode,
        seed: config.training.seed,
    };
    let mut trainer = Trainer::new(model, train_data, val_data, options, sink)?;

    let output_dir = PathBuf::from(&config.output_dir);
    let checkpoint_dir = output_dir.join("checkpoint");
    let start_epoch = if resume {
        trainer.restore(&checkpoint_dir)?
    } else {
        0
    };

    let report = trainer.train(
        config.training.epochs,
        &checkpoint_dir,
        config.training.early_stopping_patience,
        start_epoch,
    )?;

    match &report.outcome {
        TrainOutcome::Completed => println!("✓ Training completed"),
        TrainOutcome::EarlyStopped { epoch } => {
            println!("✓ Training stopped early at epoch {}", epoch + 1)
        }
    }
    println!("  Best val loss: {:.6}", trainer.best_val_loss());

    let outputs = collect_validation(
        trainer.model(),
        trainer.val_data(),
        trainer.batch_size(),
        trainer.device(),
    )?;
    let written = VizSuite::new(&output_dir, show).render_all(&report, &outputs)?;
    println!("  Charts: {} files in {}", written.len(), output_dir.display());

    Ok(())
}

/// Restore a checkpoint and render the evaluation charts without training.
fn run_report(config: &WattcastConfig, checkpoint_dir: &Path, show: bool) -> Result<()> {
    let log_dir = PathBuf::from(&config.logging.log_dir);
    logging::init(
        config.training.quiet_mode,
        &log_dir.join(&config.logging.log_file),
    )?;

    let device = select_device()?;
    let model = AttentionRegressor::new(1, HIDDEN_SIZE, DROPOUT, &device)?;
    let mut varmap = model.varmap().clone();
    let mut optimizer = wattcast::optimizer::OptimizerConfig::default().build_adamw(&varmap)?;
    let Some(state) = checkpoint::load(checkpoint_dir, &mut varmap, &mut optimizer)? else {
        println!("No checkpoint found at {}", checkpoint_dir.display());
        return Ok(());
    };
    println!("Checkpoint from epoch {}", state.epoch);
    println!("  Train loss: {:.6}", state.train_loss);
    println!("  Val loss: {:.6}", state.val_loss);
    println!("  Learning rate: {}", state.learning_rate);

    let series = demand_series(SERIES_LEN, config.training.seed);
    let split = series.len() * 4 / 5;
    let val_data = WindowDataset::from_series(&series[split..], SEQ_LEN);
    let outputs = collect_validation(&model, &val_data, config.training.batch_size, &device)?;

    // No loss histories here, so the history chart is skipped.
    let report = TrainReport {
        train_losses: Vec::new(),
        val_losses: Vec::new(),
        outcome: TrainOutcome::Completed,
    };
    let output_dir = PathBuf::from(&config.output_dir);
    let written = VizSuite::new(&output_dir, show).render_all(&report, &outputs)?;
    println!("  Charts: {} files in {}", written.len(), output_dir.display());
    Ok(())
}

/// Synthetic daily/weekly demand curve with seeded noise.
fn demand_series(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|i| {
            let t = i as f32;
            let daily = (t * std::f32::consts::TAU / 24.0).sin();
            let weekly = (t * std::f32::consts::TAU / 168.0).sin();
            let noise: f32 = rng.gen_range(-0.05..0.05);
            100.0 + 20.0 * daily + 10.0 * weekly + noise * 10.0
        })
        .collect()
}
