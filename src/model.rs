//! Model interface for the trainer, plus a reference attention regressor.
//!
//! The harness does not own the model architecture; it only requires the
//! [`ForecastModel`] contract: a batched forward pass producing one prediction
//! per input window, per-time-step attention weights for the visualization
//! suite, and access to trainable parameters for the optimizer and
//! checkpointing. [`AttentionRegressor`] is a small additive-attention model
//! satisfying that contract so the harness can be exercised end to end.

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{linear, Dropout, Linear, Module, VarBuilder, VarMap};

/// Contract between the trainer and a sequence-to-one regression model.
pub trait ForecastModel {
    /// Forward pass: `[batch, seq, features]` -> `[batch, 1]`.
    ///
    /// `train` enables training-mode layers (dropout); evaluation passes
    /// must use `train = false`.
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor>;

    /// Per-time-step attention weights: `[batch, seq, features]` -> `[batch, seq]`.
    ///
    /// Weights sum to 1 over the time axis for each sample.
    fn attention_weights(&self, xs: &Tensor) -> candle_core::Result<Tensor>;

    /// Trainable parameters, for the optimizer and for checkpointing.
    fn varmap(&self) -> &VarMap;
}

/// Additive-attention pooling regressor.
///
/// Encodes each time step with a tanh linear layer, scores the steps with a
/// second linear layer, softmax-pools the encoded sequence by those scores,
/// and maps the pooled context to a single output through a dropout-guarded
/// head.
pub struct AttentionRegressor {
    encoder: Linear,
    score: Linear,
    head: Linear,
    dropout: Dropout,
    varmap: VarMap,
}

impl AttentionRegressor {
    /// Build the model with freshly initialized parameters on `device`.
    pub fn new(
        num_features: usize,
        hidden: usize,
        dropout: f32,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let encoder = linear(num_features, hidden, vb.pp("encoder"))?;
        let score = linear(hidden, 1, vb.pp("attention"))?;
        let head = linear(hidden, 1, vb.pp("head"))?;
        Ok(Self {
            encoder,
            score,
            head,
            dropout: Dropout::new(dropout),
            varmap,
        })
    }

    /// Encoded sequence `[batch, seq, hidden]` and attention weights `[batch, seq]`.
    fn encode(&self, xs: &Tensor) -> candle_core::Result<(Tensor, Tensor)> {
        let hidden = self.encoder.forward(xs)?.tanh()?;
        let scores = self.score.forward(&hidden)?.squeeze(D::Minus1)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        Ok((hidden, weights))
    }
}

impl ForecastModel for AttentionRegressor {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let (hidden, weights) = self.encode(xs)?;
        let context = hidden
            .broadcast_mul(&weights.unsqueeze(D::Minus1)?)?
            .sum(1)?;
        let context = self.dropout.forward(&context, train)?;
        self.head.forward(&context)
    }

    fn attention_weights(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let (_, weights) = self.encode(xs)?;
        Ok(weights)
    }

    fn varmap(&self) -> &VarMap {
        &self.varmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_input(batch: usize, seq: usize, feat: usize) -> Tensor {
        Tensor::randn(0f32, 1f32, (batch, seq, feat), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_forward_output_shape() {
        let model = AttentionRegressor::new(3, 8, 0.1, &Device::Cpu).unwrap();
        let xs = toy_input(4, 12, 3);
        let preds = model.forward_t(&xs, false).unwrap();
        assert_eq!(preds.dims(), &[4, 1]);
    }

    #[test]
    fn test_attention_weights_shape_and_normalization() {
        let model = AttentionRegressor::new(2, 8, 0.0, &Device::Cpu).unwrap();
        let xs = toy_input(3, 10, 2);
        let weights = model.attention_weights(&xs).unwrap();
        assert_eq!(weights.dims(), &[3, 10]);

        let sums: Vec<f32> = weights.sum(1).unwrap().to_vec1().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_eval_forward_is_deterministic() {
        let model = AttentionRegressor::new(1, 4, 0.5, &Device::Cpu).unwrap();
        let xs = toy_input(2, 6, 1);
        let a: Vec<f32> = model
            .forward_t(&xs, false)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        let b: Vec<f32> = model
            .forward_t(&xs, false)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parameters_registered() {
        let model = AttentionRegressor::new(3, 8, 0.1, &Device::Cpu).unwrap();
        // encoder w+b, attention w+b, head w+b
        assert_eq!(model.varmap().all_vars().len(), 6);
    }
}
