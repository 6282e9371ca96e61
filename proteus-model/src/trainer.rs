//! Epoch loop for the variational auto-encoder
//!
//! Each epoch reshuffles the rows, perturbs every minibatch with Gaussian
//! input noise, and scores the reconstruction against the clean rows. The KL
//! term is weighted by the warm-up [`BetaSchedule`]. There is no early stopping.

use crate::optimizer::{AdamW, AdamWConfig};
use crate::schedule::BetaSchedule;
use crate::vae::{kl_divergence, reconstruction_loss, VariationalAutoencoder};
use crate::map_candle;
use candle_core::Tensor;
use indicatif::{ProgressBar, ProgressStyle};
use proteus_core::{EmbeddingMatrix, ProteusError, ProteusResult, RunRng, TrainingConfig};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    NotStarted,
    Training { epoch: usize },
    Converged,
}

/// Batch-averaged losses of one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub beta: f64,
    pub recon: f64,
    pub kl: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub epochs: Vec<EpochStats>,
    /// Optimizer steps taken over the whole run
    pub steps: usize,
}

impl TrainingReport {
    pub fn final_epoch(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }
}

pub struct Trainer {
    config: TrainingConfig,
    schedule: BetaSchedule,
    state: TrainerState,
    show_progress: bool,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        let schedule = BetaSchedule::from(&config);
        Self {
            config,
            schedule,
            state: TrainerState::NotStarted,
            show_progress: true,
        }
    }

    /// Draw an epoch progress bar on stderr (on by default)
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    /// Whether an epoch's losses are reported at info level
    fn is_report_epoch(&self, epoch: usize) -> bool {
        let epochs = self.config.epochs;
        epoch == 1 || epoch == epochs || epoch % (epochs / 10).max(1) == 0
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.config.epochs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos:>4}/{len:4} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━━─"),
        );
        pb.set_message("Training VAE");
        pb
    }

    /// Run every configured epoch over `data`, updating `model` in place
    pub fn train(
        &mut self,
        model: &VariationalAutoencoder,
        data: &EmbeddingMatrix,
        rng: &mut RunRng,
    ) -> ProteusResult<TrainingReport> {
        if self.state != TrainerState::NotStarted {
            return Err(ProteusError::Model("trainer has already run".into()));
        }
        if data.is_empty() {
            return Err(ProteusError::InvalidInput("no rows to train on".into()));
        }
        if data.cols() != model.input_dim() {
            return Err(ProteusError::InvalidInput(format!(
                "model expects {} input dimensions, data has {}",
                model.input_dim(),
                data.cols()
            )));
        }

        info!(
            "Training VAE ({} parameters) on {} rows: {} epochs, batch size {}",
            model.parameter_count(),
            data.rows(),
            self.config.epochs,
            self.config.batch_size
        );

        let mut optimizer = AdamW::with_params(AdamWConfig::from(&self.config), model.trainable_vars())?;
        let mut report = TrainingReport::default();
        let pb = self.progress_bar();

        for epoch in 1..=self.config.epochs {
            self.state = TrainerState::Training { epoch };
            let stats = self.run_epoch(epoch, model, data, &mut optimizer, rng)?;

            if self.is_report_epoch(epoch) {
                info!(
                    "Epoch {}/{} - Loss: {:.6e} Recon: {:.6e} KLD: {:.6e} beta={:.3}",
                    epoch, self.config.epochs, stats.total, stats.recon, stats.kl, stats.beta
                );
            } else {
                debug!(
                    "Epoch {}/{} - Loss: {:.6e} Recon: {:.6e} KLD: {:.6e} beta={:.3}",
                    epoch, self.config.epochs, stats.total, stats.recon, stats.kl, stats.beta
                );
            }
            pb.set_message(format!("Training VAE (loss {:.4e})", stats.total));
            pb.inc(1);
            report.epochs.push(stats);
        }

        pb.finish_and_clear();
        report.steps = optimizer.global_step();
        self.state = TrainerState::Converged;
        Ok(report)
    }

    fn run_epoch(
        &self,
        epoch: usize,
        model: &VariationalAutoencoder,
        data: &EmbeddingMatrix,
        optimizer: &mut AdamW,
        rng: &mut RunRng,
    ) -> ProteusResult<EpochStats> {
        let beta = self.schedule.beta(epoch);
        let device = model.device();
        let (dim, latent_dim) = (data.cols(), model.latent_dim());
        let noise_std = self.config.input_noise_std as f32;

        let order = rng.permutation(data.rows());
        let (mut recon_sum, mut kl_sum, mut total_sum) = (0.0f64, 0.0f64, 0.0f64);
        let mut batches = 0usize;

        for indices in order.chunks(self.config.batch_size) {
            let rows = indices.len();
            let clean = Tensor::from_vec(data.gather_rows(indices), (rows, dim), device)
                .map_err(map_candle)?;
            let input = if noise_std > 0.0 {
                let noise = Tensor::from_vec(rng.normal(rows * dim, noise_std), (rows, dim), device)
                    .map_err(map_candle)?;
                clean.add(&noise).map_err(map_candle)?
            } else {
                clean.clone()
            };
            let eps = Tensor::from_vec(rng.standard_normal(rows * latent_dim), (rows, latent_dim), device)
                .map_err(map_candle)?;

            let output = model.forward(&input, &eps)?;
            let recon = reconstruction_loss(&output.reconstruction, &clean)?;
            let kl = kl_divergence(&output.mean, &output.log_var)?;
            let loss = kl
                .affine(beta, 0.0)
                .and_then(|weighted| weighted.add(&recon))
                .map_err(map_candle)?;

            recon_sum += scalar(&recon)?;
            kl_sum += scalar(&kl)?;
            total_sum += scalar(&loss)?;
            batches += 1;

            optimizer.backward_step(&loss)?;
        }

        let batches = batches.max(1) as f64;
        Ok(EpochStats {
            epoch,
            beta,
            recon: recon_sum / batches,
            kl: kl_sum / batches,
            total: total_sum / batches,
        })
    }
}

fn scalar(t: &Tensor) -> ProteusResult<f64> {
    t.to_scalar::<f32>().map(f64::from).map_err(map_candle)
}
