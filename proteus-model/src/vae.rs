//! Variational auto-encoder over read embeddings
//!
//! Encoder: `D -> H (ReLU) -> {mean, log_var}` of width `L`.
//! Decoder: `L -> H (ReLU) -> D`.
//!
//! Parameters are candle [`Var`]s so the trainer can differentiate through a
//! forward pass and write updated values back in place. Noise for the
//! reparameterization is always supplied by the caller, which draws it from
//! the run's [`RunRng`] so a run never depends on a device-side generator.

use crate::map_candle;
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{Linear, Module};
use proteus_core::{ModelConfig, ProteusResult, RunRng};

/// Bounds applied to the log-variance before it is exponentiated
const LOG_VAR_MIN: f32 = -20.0;
const LOG_VAR_MAX: f32 = 20.0;

/// One affine layer backed by trainable variables
struct DenseLayer {
    /// `(out, in)` weight, the layout `candle_nn::Linear` expects
    weight: Var,
    bias: Var,
}

impl DenseLayer {
    /// Xavier/Glorot uniform weights, zero bias
    fn xavier(fan_in: usize, fan_out: usize, device: &Device, rng: &mut RunRng) -> ProteusResult<Self> {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt() as f32;
        let values = rng.symmetric_uniform(fan_in * fan_out, bound);
        let weight = Tensor::from_vec(values, (fan_out, fan_in), device).map_err(map_candle)?;
        let bias = Tensor::zeros(fan_out, DType::F32, device).map_err(map_candle)?;

        Ok(Self {
            weight: Var::from_tensor(&weight).map_err(map_candle)?,
            bias: Var::from_tensor(&bias).map_err(map_candle)?,
        })
    }

    fn linear(&self) -> Linear {
        Linear::new(self.weight.as_tensor().clone(), Some(self.bias.as_tensor().clone()))
    }

    /// A copy that is cut off from the gradient graph
    fn frozen(&self) -> Linear {
        Linear::new(self.weight.as_tensor().detach(), Some(self.bias.as_tensor().detach()))
    }

    fn vars(&self) -> [Var; 2] {
        [self.weight.clone(), self.bias.clone()]
    }

    fn len(&self) -> usize {
        self.weight.as_tensor().elem_count() + self.bias.as_tensor().elem_count()
    }
}

/// Result of one forward pass
pub struct VaeOutput {
    pub reconstruction: Tensor,
    pub mean: Tensor,
    pub log_var: Tensor,
}

pub struct VariationalAutoencoder {
    input_dim: usize,
    latent_dim: usize,
    hidden_dim: usize,
    encoder_hidden: DenseLayer,
    mean_head: DenseLayer,
    log_var_head: DenseLayer,
    decoder_hidden: DenseLayer,
    decoder_output: DenseLayer,
    device: Device,
}

impl VariationalAutoencoder {
    /// Build a freshly initialized model for `input_dim`-wide embeddings
    pub fn new(
        input_dim: usize,
        config: &ModelConfig,
        device: &Device,
        rng: &mut RunRng,
    ) -> ProteusResult<Self> {
        let (latent, hidden) = (config.latent_dim, config.hidden_dim);

        Ok(Self {
            input_dim,
            latent_dim: latent,
            hidden_dim: hidden,
            encoder_hidden: DenseLayer::xavier(input_dim, hidden, device, rng)?,
            mean_head: DenseLayer::xavier(hidden, latent, device, rng)?,
            log_var_head: DenseLayer::xavier(hidden, latent, device, rng)?,
            decoder_hidden: DenseLayer::xavier(latent, hidden, device, rng)?,
            decoder_output: DenseLayer::xavier(hidden, input_dim, device, rng)?,
            device: device.clone(),
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// `(mean, log_var)`, each `N x L`
    pub fn encode(&self, x: &Tensor) -> ProteusResult<(Tensor, Tensor)> {
        let h = self.encoder_hidden.linear().forward(x).map_err(map_candle)?;
        let h = h.relu().map_err(map_candle)?;
        let mean = self.mean_head.linear().forward(&h).map_err(map_candle)?;
        let log_var = self.log_var_head.linear().forward(&h).map_err(map_candle)?;
        Ok((mean, log_var))
    }

    pub fn decode(&self, z: &Tensor) -> ProteusResult<Tensor> {
        let h = self.decoder_hidden.linear().forward(z).map_err(map_candle)?;
        let h = h.relu().map_err(map_candle)?;
        self.decoder_output.linear().forward(&h).map_err(map_candle)
    }

    /// Encode, sample with the given standard-normal `noise` (`N x L`), decode
    pub fn forward(&self, x: &Tensor, noise: &Tensor) -> ProteusResult<VaeOutput> {
        let (mean, log_var) = self.encode(x)?;
        let z = reparameterize(&mean, &log_var, noise)?;
        let reconstruction = self.decode(&z)?;
        Ok(VaeOutput {
            reconstruction,
            mean,
            log_var,
        })
    }

    /// Every trainable parameter, encoder first
    pub fn trainable_vars(&self) -> Vec<Var> {
        [
            &self.encoder_hidden,
            &self.mean_head,
            &self.log_var_head,
            &self.decoder_hidden,
            &self.decoder_output,
        ]
        .into_iter()
        .flat_map(DenseLayer::vars)
        .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.encoder_hidden.len()
            + self.mean_head.len()
            + self.log_var_head.len()
            + self.decoder_hidden.len()
            + self.decoder_output.len()
    }

    /// Snapshot of the current parameters for gradient-free evaluation
    pub fn inference(&self) -> InferenceVae {
        InferenceVae {
            input_dim: self.input_dim,
            latent_dim: self.latent_dim,
            encoder_hidden: self.encoder_hidden.frozen(),
            mean_head: self.mean_head.frozen(),
            log_var_head: self.log_var_head.frozen(),
            decoder_hidden: self.decoder_hidden.frozen(),
            decoder_output: self.decoder_output.frozen(),
            device: self.device.clone(),
        }
    }
}

/// Detached copy of a trained model; building graphs through it is impossible
pub struct InferenceVae {
    input_dim: usize,
    latent_dim: usize,
    encoder_hidden: Linear,
    mean_head: Linear,
    log_var_head: Linear,
    decoder_hidden: Linear,
    decoder_output: Linear,
    device: Device,
}

impl InferenceVae {
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn encode(&self, x: &Tensor) -> ProteusResult<(Tensor, Tensor)> {
        let h = self
            .encoder_hidden
            .forward(x)
            .and_then(|h| h.relu())
            .map_err(map_candle)?;
        let mean = self.mean_head.forward(&h).map_err(map_candle)?;
        let log_var = self.log_var_head.forward(&h).map_err(map_candle)?;
        Ok((mean, log_var))
    }

    pub fn decode(&self, z: &Tensor) -> ProteusResult<Tensor> {
        self.decoder_hidden
            .forward(z)
            .and_then(|h| h.relu())
            .and_then(|h| self.decoder_output.forward(&h))
            .map_err(map_candle)
    }
}

/// `z = mean + noise * exp(0.5 * clamp(log_var, -20, 20))`
pub fn reparameterize(mean: &Tensor, log_var: &Tensor, noise: &Tensor) -> ProteusResult<Tensor> {
    let std = log_var
        .clamp(LOG_VAR_MIN, LOG_VAR_MAX)
        .and_then(|lv| lv.affine(0.5, 0.0))
        .and_then(|lv| lv.exp())
        .map_err(map_candle)?;
    noise
        .mul(&std)
        .and_then(|scaled| scaled.add(mean))
        .map_err(map_candle)
}

/// Mean squared error per sample, averaged over the batch
pub fn reconstruction_loss(reconstruction: &Tensor, target: &Tensor) -> ProteusResult<Tensor> {
    reconstruction
        .sub(target)
        .and_then(|d| d.sqr())
        .and_then(|d| d.mean_all())
        .map_err(map_candle)
}

/// `-0.5 * sum(1 + log_var - mean^2 - exp(log_var))` per sample, averaged over the batch
pub fn kl_divergence(mean: &Tensor, log_var: &Tensor) -> ProteusResult<Tensor> {
    let mean_sq = mean.sqr().map_err(map_candle)?;
    let var = log_var.exp().map_err(map_candle)?;
    log_var
        .affine(1.0, 1.0)
        .and_then(|t| t.sub(&mean_sq))
        .and_then(|t| t.sub(&var))
        .and_then(|t| t.sum(1))
        .and_then(|t| t.mean_all())
        .and_then(|t| t.affine(-0.5, 0.0))
        .map_err(map_candle)
}
