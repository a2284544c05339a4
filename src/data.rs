//! In-memory window dataset and batch iteration.
//!
//! Dataset construction and train/validation splitting live upstream of this
//! crate; the trainer only needs an indexable collection of
//! `(input window, target)` pairs and a batched tensor iterator over it.
//! Training iteration is shuffled with a seeded RNG for reproducibility,
//! validation iteration is in sample order. Loading is serial.

use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, WattcastError};

/// A dataset of fixed-length input windows with one scalar target each.
///
/// Windows are stored flattened as `[len, seq_len, num_features]` row-major.
#[derive(Debug, Clone)]
pub struct WindowDataset {
    inputs: Vec<f32>,
    targets: Vec<f32>,
    seq_len: usize,
    num_features: usize,
}

impl WindowDataset {
    /// Create a dataset from per-sample windows.
    ///
    /// # Errors
    ///
    /// Returns `WattcastError::Data` when the window and target counts differ
    /// or a window does not have `seq_len * num_features` values.
    pub fn new(
        windows: Vec<Vec<f32>>,
        targets: Vec<f32>,
        seq_len: usize,
        num_features: usize,
    ) -> Result<Self> {
        if windows.len() != targets.len() {
            return Err(WattcastError::Data(format!(
                "{} windows but {} targets",
                windows.len(),
                targets.len()
            )));
        }
        let expected = seq_len * num_features;
        let mut inputs = Vec::with_capacity(windows.len() * expected);
        for (i, window) in windows.iter().enumerate() {
            if window.len() != expected {
                return Err(WattcastError::Data(format!(
                    "window {} has {} values, expected {}",
                    i,
                    window.len(),
                    expected
                )));
            }
            inputs.extend_from_slice(window);
        }
        Ok(Self {
            inputs,
            targets,
            seq_len,
            num_features,
        })
    }

    /// Build a univariate dataset by sliding a window over a series.
    ///
    /// Each window of `seq_len` consecutive values predicts the value that
    /// follows it. Series shorter than `seq_len + 1` yield an empty dataset.
    pub fn from_series(series: &[f32], seq_len: usize) -> Self {
        let mut inputs = Vec::new();
        let mut targets = Vec::new();
        if series.len() > seq_len {
            for start in 0..series.len() - seq_len {
                inputs.extend_from_slice(&series[start..start + seq_len]);
                targets.push(series[start + seq_len]);
            }
        }
        Self {
            inputs,
            targets,
            seq_len,
            num_features: 1,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the dataset holds no samples.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Window length in time steps.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Features per time step.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Number of batches one pass produces at the given batch size.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.len().div_ceil(batch_size)
    }

    /// Batched tensor iterator over the dataset.
    ///
    /// `shuffle` draws a fresh sample order from `seed`; otherwise batches are
    /// in sample order. The final batch may be smaller than `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns `WattcastError::Data` for a zero batch size.
    pub fn batches(
        &self,
        batch_size: usize,
        shuffle: bool,
        seed: u64,
        device: &Device,
    ) -> Result<BatchIter<'_>> {
        if batch_size == 0 {
            return Err(WattcastError::Data("batch size must be positive".to_string()));
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        if shuffle {
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        Ok(BatchIter {
            dataset: self,
            order,
            pos: 0,
            batch_size,
            device: device.clone(),
        })
    }
}

/// Iterator yielding `(inputs, targets)` tensor pairs on a fixed device.
///
/// Inputs have shape `[batch, seq_len, num_features]`, targets `[batch, 1]`.
pub struct BatchIter<'a> {
    dataset: &'a WindowDataset,
    order: Vec<usize>,
    pos: usize,
    batch_size: usize,
    device: Device,
}

impl BatchIter<'_> {
    fn build_batch(&self, indices: &[usize]) -> Result<(Tensor, Tensor)> {
        let stride = self.dataset.seq_len * self.dataset.num_features;
        let mut inputs = Vec::with_capacity(indices.len() * stride);
        let mut targets = Vec::with_capacity(indices.len());
        for &i in indices {
            inputs.extend_from_slice(&self.dataset.inputs[i * stride..(i + 1) * stride]);
            targets.push(self.dataset.targets[i]);
        }
        let inputs = Tensor::from_vec(
            inputs,
            (
                indices.len(),
                self.dataset.seq_len,
                self.dataset.num_features,
            ),
            &self.device,
        )?;
        let targets = Tensor::from_vec(targets, (indices.len(), 1), &self.device)?;
        Ok((inputs, targets))
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Result<(Tensor, Tensor)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.order.len());
        let indices: Vec<usize> = self.order[self.pos..end].to_vec();
        self.pos = end;
        Some(self.build_batch(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_dataset(n: usize, seq_len: usize) -> WindowDataset {
        let windows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32; seq_len]).collect();
        let targets: Vec<f32> = (0..n).map(|i| i as f32).collect();
        WindowDataset::new(windows, targets, seq_len, 1).unwrap()
    }

    #[test]
    fn test_mismatched_counts_rejected() {
        let result = WindowDataset::new(vec![vec![0.0; 4]], vec![1.0, 2.0], 4, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_window_length_rejected() {
        let result = WindowDataset::new(vec![vec![0.0; 3]], vec![1.0], 4, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_series_windowing() {
        let series: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let ds = WindowDataset::from_series(&series, 4);
        // Windows [0..4] -> 4.0, [1..5] -> 5.0, ..., [5..9] -> 9.0
        assert_eq!(ds.len(), 6);
        assert_eq!(ds.targets[0], 4.0);
        assert_eq!(ds.targets[5], 9.0);
    }

    #[test]
    fn test_from_series_too_short() {
        let ds = WindowDataset::from_series(&[1.0, 2.0], 4);
        assert!(ds.is_empty());
    }

    #[test]
    fn test_batch_shapes_and_final_partial_batch() {
        let ds = toy_dataset(10, 4);
        let batches: Vec<_> = ds
            .batches(4, false, 0, &Device::Cpu)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0.dims(), &[4, 4, 1]);
        assert_eq!(batches[0].1.dims(), &[4, 1]);
        assert_eq!(batches[2].0.dims(), &[2, 4, 1]);
    }

    #[test]
    fn test_unshuffled_order_is_sample_order() {
        let ds = toy_dataset(5, 2);
        let (_, targets) = ds
            .batches(5, false, 0, &Device::Cpu)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let values: Vec<f32> = targets.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_shuffled_order_is_seed_deterministic() {
        let ds = toy_dataset(16, 2);
        let collect = |seed| -> Vec<f32> {
            ds.batches(16, true, seed, &Device::Cpu)
                .unwrap()
                .next()
                .unwrap()
                .unwrap()
                .1
                .flatten_all()
                .unwrap()
                .to_vec1()
                .unwrap()
        };
        assert_eq!(collect(7), collect(7));

        let mut shuffled = collect(7);
        shuffled.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f32> = (0..16).map(|i| i as f32).collect();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let ds = toy_dataset(4, 2);
        assert!(ds.batches(0, false, 0, &Device::Cpu).is_err());
    }

    #[test]
    fn test_num_batches() {
        let ds = toy_dataset(64, 2);
        assert_eq!(ds.num_batches(32), 2);
        assert_eq!(ds.num_batches(30), 3);
    }
}
