//! Latent extraction, standardization and projection

use crate::map_candle;
use crate::projection::{ProjectionChain, ProjectionOutcome};
use crate::vae::{reparameterize, InferenceVae};
use candle_core::Tensor;
use nalgebra::DMatrix;
use proteus_core::{EmbeddingMatrix, MatrixStats, ProteusError, ProteusResult, RunRng};
use tracing::{info, warn};

const CONSTANT_ULPS: f64 = 4.0;

/// Per-read outputs of the trained model
#[derive(Debug, Clone)]
pub struct LatentOutput {
    /// Encoder means, `N x L`
    pub latent: DMatrix<f64>,
    /// MSE between each clean row and the decoding of one sampled latent point
    pub recon_errors: Vec<f64>,
    pub latent_stats: MatrixStats,
    pub recon_stats: MatrixStats,
    /// Global latent spread fell below the collapse threshold
    pub collapsed: bool,
    /// Standardized, projected latents used for clustering
    pub projection: ProjectionOutcome,
}

pub struct LatentPostprocessor {
    batch_size: usize,
    collapse_threshold: f64,
    chain: ProjectionChain,
}

impl LatentPostprocessor {
    pub fn new(batch_size: usize, collapse_threshold: f64, chain: ProjectionChain) -> Self {
        Self {
            batch_size: batch_size.max(1),
            collapse_threshold,
            chain,
        }
    }

    /// Encode every row, then standardize and project the latent means
    pub fn process(
        &self,
        model: &InferenceVae,
        data: &EmbeddingMatrix,
        rng: &mut RunRng,
    ) -> ProteusResult<LatentOutput> {
        let (latent, recon_errors) = self.extract(model, data, rng)?;

        let latent_stats = MatrixStats::from_values(latent.iter().copied());
        let recon_stats = MatrixStats::from_values(recon_errors.iter().copied());
        info!(
            "Latent stats: min={:.6e}, max={:.6e}, std={:.6e}",
            latent_stats.min, latent_stats.max, latent_stats.std
        );
        info!(
            "Recon error stats: min={:.6e}, max={:.6e}, mean={:.6e}",
            recon_stats.min, recon_stats.max, recon_stats.mean
        );

        let collapsed = is_collapsed(&latent_stats, self.collapse_threshold);
        if collapsed {
            warn!(
                "Latent space has extremely low std ({:.3e}); possible posterior collapse. \
                 Consider lowering training.beta_final or raising training.input_noise_std",
                latent_stats.std
            );
        }

        let scaled = standardize(&latent);
        let projection = self.chain.project(&scaled, rng)?;

        Ok(LatentOutput {
            latent,
            recon_errors,
            latent_stats,
            recon_stats,
            collapsed,
            projection,
        })
    }

    /// Latent means and sampled reconstruction errors, chunked by batch size
    pub fn extract(
        &self,
        model: &InferenceVae,
        data: &EmbeddingMatrix,
        rng: &mut RunRng,
    ) -> ProteusResult<(DMatrix<f64>, Vec<f64>)> {
        if data.cols() != model.input_dim() {
            return Err(ProteusError::InvalidInput(format!(
                "model expects {} input dimensions, data has {}",
                model.input_dim(),
                data.cols()
            )));
        }

        let (n, dim, latent_dim) = (data.rows(), data.cols(), model.latent_dim());
        let mut means = Vec::with_capacity(n * latent_dim);
        let mut errors = Vec::with_capacity(n);

        let mut start = 0;
        while start < n {
            let end = (start + self.batch_size).min(n);
            let rows = end - start;
            let chunk = data.as_slice()[start * dim..end * dim].to_vec();
            let x = Tensor::from_vec(chunk, (rows, dim), model.device()).map_err(map_candle)?;

            let (mean, log_var) = model.encode(&x)?;
            let eps = Tensor::from_vec(rng.standard_normal(rows * latent_dim), (rows, latent_dim), model.device())
                .map_err(map_candle)?;
            let z = reparameterize(&mean, &log_var, &eps)?;
            let recon = model.decode(&z)?;

            let row_mse: Vec<f32> = recon
                .sub(&x)
                .and_then(|d| d.sqr())
                .and_then(|d| d.mean(1))
                .and_then(|d| d.to_vec1())
                .map_err(map_candle)?;
            errors.extend(row_mse.into_iter().map(f64::from));

            let block: Vec<f32> = mean.flatten_all().and_then(|m| m.to_vec1()).map_err(map_candle)?;
            means.extend(block.into_iter().map(f64::from));

            start = end;
        }

        Ok((DMatrix::from_row_slice(n, latent_dim, &means), errors))
    }
}

pub fn is_collapsed(stats: &MatrixStats, threshold: f64) -> bool {
    stats.std < threshold
}

/// Per-column zero mean and unit population variance.
///
/// Latents come out of single-precision arithmetic, so a column whose spread is
/// within a few ulps of its mean is constant: it becomes all zeros.
pub fn standardize(data: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = data.clone();
    let n = data.nrows().max(1) as f64;
    for (j, column) in data.column_iter().enumerate() {
        let mean = column.sum() / n;
        let var = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = var.sqrt();
        let resolution = CONSTANT_ULPS * f64::from(f32::EPSILON) * mean.abs();
        for v in out.column_mut(j).iter_mut() {
            *v = if std <= resolution { 0.0 } else { (*v - mean) / std };
        }
    }
    out
}
