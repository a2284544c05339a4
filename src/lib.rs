//! Sequence-to-one power demand forecasting with an attention regressor.
//!
//! The crate provides the full training harness: windowed datasets, the
//! model, AdamW with gradient clipping, plateau LR scheduling, early
//! stopping, checkpointing and a post-training chart suite.

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod early_stopping;
pub mod error;
pub mod eval;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod optimizer;
pub mod scheduler;
pub mod trainer;
pub mod viz;

pub use config::WattcastConfig;
pub use data::WindowDataset;
pub use error::{Result, WattcastError};
pub use model::{AttentionRegressor, ForecastModel};
pub use trainer::{select_device, TrainOutcome, TrainReport, Trainer, TrainerOptions};
