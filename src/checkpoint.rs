//! Checkpoint persistence.
//!
//! A checkpoint is a directory holding two files: `training_state.json` with
//! the epoch, losses and learning rate, and `model.safetensors` with the model
//! weights. Saving overwrites both files in place, so the directory always
//! holds the single best state seen so far.

use std::fs;
use std::path::Path;

use candle_nn::VarMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WattcastError};
use crate::optimizer::AdamWOptimizer;

const STATE_FILE: &str = "training_state.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Scalar training state stored alongside the model weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Epoch index at which this checkpoint was written.
    pub epoch: usize,
    /// Mean training loss of that epoch.
    pub train_loss: f32,
    /// Mean validation loss of that epoch.
    pub val_loss: f32,
    /// Optimizer learning rate at save time.
    pub learning_rate: f64,
}

/// Save the training state and model weights to `dir`, overwriting in place.
pub fn save(dir: &Path, checkpoint: &Checkpoint, varmap: &VarMap) -> Result<()> {
    fs::create_dir_all(dir)?;

    let state_json = serde_json::to_string_pretty(checkpoint)?;
    fs::write(dir.join(STATE_FILE), state_json)?;
    varmap.save(dir.join(WEIGHTS_FILE))?;

    info!(
        epoch = checkpoint.epoch,
        val_loss = checkpoint.val_loss,
        path = %dir.display(),
        "saved checkpoint"
    );
    Ok(())
}

/// Load a checkpoint from `dir`, restoring model weights into `varmap` and the
/// learning rate into `optimizer`.
///
/// Returns `Ok(None)` when no checkpoint exists at `dir`, so callers can treat
/// a missing checkpoint as a fresh start.
pub fn load(
    dir: &Path,
    varmap: &mut VarMap,
    optimizer: &mut AdamWOptimizer,
) -> Result<Option<Checkpoint>> {
    let state_path = dir.join(STATE_FILE);
    if !state_path.exists() {
        warn!(path = %dir.display(), "no checkpoint found, starting fresh");
        return Ok(None);
    }

    let state_json = fs::read_to_string(&state_path)?;
    let checkpoint: Checkpoint = serde_json::from_str(&state_json)?;

    let weights_path = dir.join(WEIGHTS_FILE);
    if !weights_path.exists() {
        return Err(WattcastError::Checkpoint(format!(
            "state file present but weights missing at {}",
            weights_path.display()
        )));
    }
    varmap.load(&weights_path)?;
    optimizer.set_learning_rate(checkpoint.learning_rate);

    info!(
        epoch = checkpoint.epoch,
        val_loss = checkpoint.val_loss,
        learning_rate = checkpoint.learning_rate,
        "restored checkpoint"
    );
    Ok(Some(checkpoint))
}

/// Read only the scalar state from `dir`, without touching model weights.
pub fn read_state(dir: &Path) -> Result<Option<Checkpoint>> {
    let state_path = dir.join(STATE_FILE);
    if !state_path.exists() {
        return Ok(None);
    }
    let state_json = fs::read_to_string(&state_path)?;
    Ok(Some(serde_json::from_str(&state_json)?))
}
