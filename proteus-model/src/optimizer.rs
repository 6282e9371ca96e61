//! AdamW over candle `Var`s with global gradient-norm clipping

use crate::map_candle;
use candle_core::{Tensor, Var};
use proteus_core::{ProteusResult, TrainingConfig};

#[derive(Debug, Clone)]
pub struct AdamWConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Decoupled weight decay coefficient
    pub weight_decay: f64,
    /// Ceiling for the global gradient norm
    pub max_grad_norm: f64,
}

impl Default for AdamWConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 1e-6,
            max_grad_norm: 5.0,
        }
    }
}

impl From<&TrainingConfig> for AdamWConfig {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            weight_decay: config.weight_decay,
            max_grad_norm: config.max_grad_norm,
            ..Self::default()
        }
    }
}

/// A trainable variable with its moment estimates
struct TrackedParam {
    var: Var,
    m: Tensor,
    v: Tensor,
}

pub struct AdamW {
    config: AdamWConfig,
    params: Vec<TrackedParam>,
    step: usize,
}

/// Scale factor that brings a gradient of norm `norm` under `max_norm`
pub fn clip_coefficient(norm: f64, max_norm: f64) -> f64 {
    if norm > max_norm {
        max_norm / (norm + 1e-6)
    } else {
        1.0
    }
}

impl AdamW {
    pub fn new(config: AdamWConfig) -> Self {
        Self {
            config,
            params: Vec::new(),
            step: 0,
        }
    }

    /// Track every variable in `vars`
    pub fn with_params(config: AdamWConfig, vars: Vec<Var>) -> ProteusResult<Self> {
        let mut optimizer = Self::new(config);
        for var in vars {
            optimizer.add_param(var)?;
        }
        Ok(optimizer)
    }

    pub fn add_param(&mut self, var: Var) -> ProteusResult<()> {
        let m = var.as_tensor().zeros_like().map_err(map_candle)?;
        let v = var.as_tensor().zeros_like().map_err(map_candle)?;
        self.params.push(TrackedParam { var, m, v });
        Ok(())
    }

    /// Backpropagate `loss`, clip, and update every tracked parameter.
    ///
    /// Returns the gradient norm measured before clipping.
    pub fn backward_step(&mut self, loss: &Tensor) -> ProteusResult<f64> {
        self.step += 1;
        let t = self.step as i32;
        let grads = loss.backward().map_err(map_candle)?;

        let mut total_sq = 0.0f64;
        for param in &self.params {
            if let Some(grad) = grads.get(param.var.as_tensor()) {
                let sq_sum: f32 = grad
                    .sqr()
                    .and_then(|g| g.sum_all())
                    .and_then(|g| g.to_scalar())
                    .map_err(map_candle)?;
                total_sq += sq_sum as f64;
            }
        }
        let total_norm = total_sq.sqrt();
        let clip_scale = clip_coefficient(total_norm, self.config.max_grad_norm);

        let cfg = &self.config;
        let lr = cfg.learning_rate;
        let bc1 = 1.0 - cfg.beta1.powi(t);
        let bc2 = 1.0 - cfg.beta2.powi(t);

        for param in &mut self.params {
            let grad = match grads.get(param.var.as_tensor()) {
                Some(g) => g,
                None => continue,
            };
            let grad = if clip_scale < 1.0 {
                grad.affine(clip_scale, 0.0).map_err(map_candle)?
            } else {
                grad.clone()
            };

            // m = b1 * m + (1 - b1) * g
            param.m = param
                .m
                .affine(cfg.beta1, 0.0)
                .and_then(|m| m.add(&grad.affine(1.0 - cfg.beta1, 0.0)?))
                .map_err(map_candle)?
                .detach();

            // v = b2 * v + (1 - b2) * g^2
            param.v = grad
                .sqr()
                .and_then(|g2| g2.affine(1.0 - cfg.beta2, 0.0))
                .and_then(|g2| param.v.affine(cfg.beta2, 0.0)?.add(&g2))
                .map_err(map_candle)?
                .detach();

            let m_hat = param.m.affine(1.0 / bc1, 0.0).map_err(map_candle)?;
            let denom = param
                .v
                .affine(1.0 / bc2, 0.0)
                .and_then(|v| v.sqrt())
                .and_then(|v| v.affine(1.0, cfg.epsilon))
                .map_err(map_candle)?;
            let update = m_hat
                .div(&denom)
                .and_then(|u| u.affine(-lr, 0.0))
                .map_err(map_candle)?;

            // theta = theta * (1 - lr * wd) + update
            let current = param.var.as_tensor();
            let next = current
                .affine(1.0 - lr * cfg.weight_decay, 0.0)
                .and_then(|p| p.add(&update))
                .map_err(map_candle)?
                .detach();
            param.var.set(&next).map_err(map_candle)?;
        }

        Ok(total_norm)
    }

    pub fn global_step(&self) -> usize {
        self.step
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn config(&self) -> &AdamWConfig {
        &self.config
    }
}
