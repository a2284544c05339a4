//! AdamW optimizer wrapper with gradient-norm clipping.

use candle_core::backprop::GradStore;
use candle_core::Tensor;
use candle_nn::{Optimizer, ParamsAdamW, VarMap};

use crate::error::{Result, WattcastError};

/// Optimizer configuration.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Beta1 for Adam
    pub beta1: f64,
    /// Beta2 for Adam
    pub beta2: f64,
    /// Weight decay
    pub weight_decay: f64,
    /// Epsilon for numerical stability
    pub eps: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            beta1: 0.9,
            beta2: 0.999,
            weight_decay: 1e-5,
            eps: 1e-8,
        }
    }
}

impl OptimizerConfig {
    /// Create AdamW over all variables in the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the optimizer cannot be created.
    pub fn build_adamw(&self, varmap: &VarMap) -> Result<AdamWOptimizer> {
        let vars = varmap.all_vars();
        let params = ParamsAdamW {
            lr: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            eps: self.eps,
            weight_decay: self.weight_decay,
        };

        let opt = candle_nn::AdamW::new(vars, params)
            .map_err(|e| WattcastError::Training(format!("Failed to create AdamW: {}", e)))?;

        Ok(AdamWOptimizer { inner: opt })
    }
}

/// AdamW optimizer wrapper.
pub struct AdamWOptimizer {
    inner: candle_nn::AdamW,
}

impl AdamWOptimizer {
    /// Backward pass, clip the global gradient norm, then apply one step.
    ///
    /// Clipping mitigates exploding gradients from the sequence model.
    ///
    /// # Errors
    ///
    /// Returns an error if backward or the optimizer step fails.
    pub fn step_clipped(
        &mut self,
        loss: &Tensor,
        varmap: &VarMap,
        max_norm: f32,
    ) -> Result<()> {
        let mut grads = loss.backward()?;
        clip_grad_norm(&mut grads, varmap, max_norm)?;
        self.inner
            .step(&grads)
            .map_err(|e| WattcastError::Training(format!("Optimizer step failed: {}", e)))
    }

    /// Get current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.inner.learning_rate()
    }

    /// Set learning rate (used by schedulers and checkpoint restore).
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.inner.set_learning_rate(lr);
    }
}

/// Scale gradients in place so their global L2 norm does not exceed `max_norm`.
///
/// Returns the pre-clip norm. Variables without a gradient are skipped.
pub fn clip_grad_norm(grads: &mut GradStore, varmap: &VarMap, max_norm: f32) -> Result<f32> {
    let vars = varmap.all_vars();
    let mut total_sq = 0f32;
    for var in vars.iter() {
        if let Some(grad) = grads.get(var) {
            total_sq += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
        }
    }
    let norm = total_sq.sqrt();
    if norm.is_finite() && norm > max_norm {
        let scale = (max_norm / norm) as f64;
        for var in vars.iter() {
            if let Some(grad) = grads.remove(var) {
                grads.insert(var, (grad * scale)?);
            }
        }
    }
    Ok(norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{Device, Var};

    #[test]
    fn test_optimizer_config_default() {
        let config = OptimizerConfig::default();
        assert_eq!(config.learning_rate, 1e-4);
        assert_eq!(config.weight_decay, 1e-5);
    }

    #[test]
    fn test_build_adamw() -> Result<()> {
        let config = OptimizerConfig::default();
        let varmap = VarMap::new();

        let mut optimizer = config.build_adamw(&varmap)?;
        assert_eq!(optimizer.learning_rate(), 1e-4);
        optimizer.set_learning_rate(5e-5);
        assert_eq!(optimizer.learning_rate(), 5e-5);

        Ok(())
    }

    #[test]
    fn test_clip_grad_norm_scales_large_gradients() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let var = Var::from_tensor(&Tensor::from_vec(vec![3.0f32, 4.0], (2,), &device)?)?;
        varmap
            .data()
            .lock()
            .unwrap()
            .insert("w".to_string(), var.clone());

        // loss = sum(10 * w) has gradient [10, 10], norm = sqrt(200)
        let loss = (var.as_tensor() * 10.0)?.sum_all()?;
        let mut grads = loss.backward()?;

        let norm = clip_grad_norm(&mut grads, &varmap, 1.0)?;
        assert!((norm - 200f32.sqrt()).abs() < 1e-4);

        let clipped = grads.get(&var).unwrap();
        let clipped_norm = clipped.sqr()?.sum_all()?.to_scalar::<f32>()?.sqrt();
        assert!((clipped_norm - 1.0).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_clip_grad_norm_leaves_small_gradients() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let var = Var::from_tensor(&Tensor::from_vec(vec![0.1f32, 0.2], (2,), &device)?)?;
        varmap
            .data()
            .lock()
            .unwrap()
            .insert("w".to_string(), var.clone());

        let loss = (var.as_tensor() * 0.5)?.sum_all()?;
        let mut grads = loss.backward()?;

        let norm = clip_grad_norm(&mut grads, &varmap, 1.0)?;
        assert!(norm < 1.0);

        let grad: Vec<f32> = grads.get(&var).unwrap().to_vec1()?;
        assert!((grad[0] - 0.5).abs() < 1e-6);
        assert!((grad[1] - 0.5).abs() < 1e-6);
        Ok(())
    }
}
