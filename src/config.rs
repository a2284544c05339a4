//! Configuration parsing and validation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WattcastError};

/// Main configuration for a wattcast training run.
///
/// # Example
///
/// ```rust
/// use wattcast::config::WattcastConfig;
///
/// let config = WattcastConfig::default();
/// config.validate().unwrap();
/// assert!(config.training.show_progress);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WattcastConfig {
    /// Training hyperparameters and display flags.
    #[serde(default)]
    pub training: TrainingSettings,

    /// Logging and metrics sink configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Output directory for checkpoints and charts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Sequences per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// AdamW learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Number of epochs to train.
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Epochs without validation improvement before stopping.
    #[serde(default = "default_patience")]
    pub early_stopping_patience: usize,

    /// Show per-batch progress bars.
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Suppress console output (file logging still applies).
    #[serde(default)]
    pub quiet_mode: bool,

    /// Seed for the training batch shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Enable the scalar metrics sink (JSONL series under `log_dir`).
    #[serde(default)]
    pub tensorboard: bool,

    /// Directory for scalar metrics output.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Plain-text training log file.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_output_dir() -> String {
    "./outputs".into()
}

fn default_batch_size() -> usize {
    32
}

fn default_learning_rate() -> f64 {
    1e-4
}

fn default_epochs() -> usize {
    50
}

fn default_patience() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_seed() -> u64 {
    42
}

fn default_log_dir() -> String {
    "./runs".into()
}

fn default_log_file() -> String {
    "training.log".into()
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            early_stopping_patience: default_patience(),
            show_progress: true,
            quiet_mode: false,
            seed: default_seed(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            tensorboard: false,
            log_dir: default_log_dir(),
            log_file: default_log_file(),
        }
    }
}

impl Default for WattcastConfig {
    fn default() -> Self {
        Self {
            training: TrainingSettings::default(),
            logging: LoggingSettings::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl WattcastConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Write configuration to a YAML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), yaml)?;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `WattcastError::Config` for non-positive batch size, learning
    /// rate, or epoch count.
    pub fn validate(&self) -> Result<()> {
        if self.training.batch_size == 0 {
            return Err(WattcastError::Config(
                "training.batch_size must be positive".to_string(),
            ));
        }
        if self.training.learning_rate <= 0.0 {
            return Err(WattcastError::Config(
                "training.learning_rate must be positive".to_string(),
            ));
        }
        if self.training.epochs == 0 {
            return Err(WattcastError::Config(
                "training.epochs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
