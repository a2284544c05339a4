//! Plateau-based learning rate reduction.

use crate::optimizer::AdamWOptimizer;

/// Reduces the learning rate when validation loss stops improving.
///
/// After `patience` consecutive epochs without improvement the optimizer's
/// learning rate is multiplied by `factor` and the counter resets.
#[derive(Debug, Clone)]
pub struct ReduceOnPlateau {
    factor: f64,
    patience: usize,
    best: f32,
    counter: usize,
}

impl ReduceOnPlateau {
    /// Create a scheduler with the given reduction factor and patience.
    pub fn new(factor: f64, patience: usize) -> Self {
        Self {
            factor,
            patience,
            best: f32::INFINITY,
            counter: 0,
        }
    }

    /// Feed one epoch's validation loss and update the optimizer if due.
    ///
    /// Returns the new learning rate when a reduction happened.
    pub fn step(&mut self, val_loss: f32, optimizer: &mut AdamWOptimizer) -> Option<f64> {
        if val_loss < self.best {
            self.best = val_loss;
            self.counter = 0;
            return None;
        }
        self.counter += 1;
        if self.counter > self.patience {
            let lr = optimizer.learning_rate() * self.factor;
            optimizer.set_learning_rate(lr);
            self.counter = 0;
            return Some(lr);
        }
        None
    }

    /// Epochs since the last improvement.
    pub fn counter(&self) -> usize {
        self.counter
    }
}

impl Default for ReduceOnPlateau {
    /// Halve the rate after 5 non-improving epochs.
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}
