//! Early stopping on validation loss.
//!
//! Tracks the best validation loss seen so far and the number of consecutive
//! epochs without strict improvement. The trainer writes a checkpoint exactly
//! when [`StoppingDecision::NewBest`] is returned, so the sequence of written
//! checkpoints has strictly decreasing validation losses.

/// Early stopping state tracker.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    /// Epochs with no improvement before stopping.
    patience: usize,
    /// Best validation loss observed so far.
    best_value: f32,
    /// Epoch at which the best value was observed.
    best_epoch: usize,
    /// Consecutive epochs without improvement.
    counter: usize,
    /// Whether the stopping criterion has been met.
    stopped: bool,
}

/// Result of checking a new validation loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoppingDecision {
    /// New best value; the caller should persist a checkpoint.
    NewBest,
    /// No improvement, patience not yet exhausted.
    NoImprovement {
        /// Epochs without improvement.
        count: usize,
        /// Epochs remaining before stopping.
        remaining: usize,
    },
    /// Patience exhausted; training should stop.
    Stop,
}

impl EarlyStopping {
    /// Create a tracker that stops after `patience` non-improving epochs.
    pub fn new(patience: usize) -> Self {
        Self::with_best(patience, f32::INFINITY)
    }

    /// Create a tracker seeded with a known best loss (e.g. when resuming).
    pub fn with_best(patience: usize, best_value: f32) -> Self {
        Self {
            patience,
            best_value,
            best_epoch: 0,
            counter: 0,
            stopped: false,
        }
    }

    /// Check one epoch's validation loss and update internal state.
    ///
    /// Improvement is strict: a loss equal to the best so far does not count.
    pub fn check(&mut self, value: f32, epoch: usize) -> StoppingDecision {
        if self.stopped {
            return StoppingDecision::Stop;
        }

        if value < self.best_value {
            self.best_value = value;
            self.best_epoch = epoch;
            self.counter = 0;
            StoppingDecision::NewBest
        } else {
            self.counter += 1;
            if self.counter >= self.patience {
                self.stopped = true;
                StoppingDecision::Stop
            } else {
                StoppingDecision::NoImprovement {
                    count: self.counter,
                    remaining: self.patience - self.counter,
                }
            }
        }
    }

    /// Clear all state, keeping the configured patience.
    pub fn reset(&mut self) {
        self.best_value = f32::INFINITY;
        self.best_epoch = 0;
        self.counter = 0;
        self.stopped = false;
    }

    /// Whether the stopping criterion has been met.
    pub fn should_stop(&self) -> bool {
        self.stopped
    }

    /// Best validation loss observed so far.
    pub fn best_value(&self) -> f32 {
        self.best_value
    }

    /// Epoch of the best observation.
    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    /// Consecutive epochs without improvement.
    pub fn counter(&self) -> usize {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_is_best() {
        let mut stopper = EarlyStopping::new(3);
        assert_eq!(stopper.check(1.0, 0), StoppingDecision::NewBest);
        assert_eq!(stopper.best_value(), 1.0);
        assert_eq!(stopper.best_epoch(), 0);
    }

    #[test]
    fn test_equal_value_is_not_improvement() {
        let mut stopper = EarlyStopping::new(3);
        stopper.check(1.0, 0);
        match stopper.check(1.0, 1) {
            StoppingDecision::NoImprovement { count, remaining } => {
                assert_eq!(count, 1);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected NoImprovement, got {:?}", other),
        }
    }

    #[test]
    fn test_stops_after_patience_exhausted() {
        let mut stopper = EarlyStopping::new(3);
        stopper.check(1.0, 0);
        stopper.check(1.0, 1);
        stopper.check(1.0, 2);
        assert_eq!(stopper.check(1.0, 3), StoppingDecision::Stop);
        assert!(stopper.should_stop());
    }

    #[test]
    fn test_improving_every_epoch_never_stops() {
        // Strictly improving losses over 3 epochs with patience 2
        // produce 3 checkpoint writes and no stop.
        let mut stopper = EarlyStopping::new(2);
        let mut writes = 0;
        for (epoch, loss) in [0.9f32, 0.8, 0.7].iter().enumerate() {
            if stopper.check(*loss, epoch) == StoppingDecision::NewBest {
                writes += 1;
            }
        }
        assert_eq!(writes, 3);
        assert!(!stopper.should_stop());
    }

    #[test]
    fn test_constant_losses_write_once_and_stop() {
        // Constant validation loss writes exactly one checkpoint
        // (the first epoch) and stops after patience 2.
        let mut stopper = EarlyStopping::new(2);
        let mut writes = 0;
        let mut epochs_run = 0;
        for epoch in 0..3 {
            epochs_run += 1;
            match stopper.check(0.5, epoch) {
                StoppingDecision::NewBest => writes += 1,
                StoppingDecision::Stop => break,
                StoppingDecision::NoImprovement { .. } => {}
            }
        }
        assert_eq!(writes, 1);
        assert_eq!(epochs_run, 3);
        assert!(stopper.should_stop());
    }

    #[test]
    fn test_written_best_values_strictly_decrease() {
        let losses = [1.0f32, 0.8, 0.85, 0.8, 0.6, 0.6, 0.59];
        let mut stopper = EarlyStopping::new(10);
        let mut written = Vec::new();
        for (epoch, loss) in losses.iter().enumerate() {
            if stopper.check(*loss, epoch) == StoppingDecision::NewBest {
                written.push(*loss);
            }
        }
        assert_eq!(written, vec![1.0, 0.8, 0.6, 0.59]);
        for pair in written.windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut stopper = EarlyStopping::new(1);
        stopper.check(1.0, 0);
        stopper.check(1.0, 1);
        assert!(stopper.should_stop());
        stopper.reset();
        assert!(!stopper.should_stop());
        assert_eq!(stopper.check(2.0, 0), StoppingDecision::NewBest);
    }

    #[test]
    fn test_with_best_seeds_threshold() {
        let mut stopper = EarlyStopping::with_best(3, 0.5);
        assert_ne!(stopper.check(0.6, 0), StoppingDecision::NewBest);
        assert_eq!(stopper.check(0.4, 1), StoppingDecision::NewBest);
    }
}
