//! Latent representation learning, projection and density clustering for Proteus

pub mod cluster;
pub mod latent;
pub mod novelty;
pub mod optimizer;
pub mod projection;
pub mod schedule;
pub mod trainer;
pub mod vae;

use candle_core::Device;
use proteus_core::{DeviceChoice, ProteusError, ProteusResult};
use tracing::{info, warn};

// Re-export commonly used types
pub use cluster::{ClusterOutcome, DensityClusterer};
pub use latent::{LatentOutput, LatentPostprocessor};
pub use novelty::NoveltyScorer;
pub use optimizer::{AdamW, AdamWConfig};
pub use projection::{
    FailedAttempt, ProjectionChain, ProjectionFailure, ProjectionOutcome, ProjectionStrategy,
    ProjectionTier,
};
pub use schedule::BetaSchedule;
pub use trainer::{EpochStats, Trainer, TrainerState, TrainingReport};
pub use vae::{InferenceVae, VaeOutput, VariationalAutoencoder};

/// Map candle errors into the workspace error type
pub(crate) fn map_candle(e: candle_core::Error) -> ProteusError {
    ProteusError::Model(format!("tensor operation failed: {}", e))
}

/// Resolve the configured device once at the start of a run
pub fn select_device(choice: DeviceChoice) -> ProteusResult<Device> {
    let device = match choice {
        DeviceChoice::Cpu => Device::Cpu,
        DeviceChoice::Cuda => Device::new_cuda(0).map_err(|e| {
            ProteusError::Configuration(format!("CUDA device requested but unavailable: {}", e))
        })?,
        DeviceChoice::Auto => match Device::cuda_if_available(0) {
            Ok(device) => device,
            Err(e) => {
                warn!("CUDA probe failed ({}); using CPU", e);
                Device::Cpu
            }
        },
    };
    info!("Using device: {}", if device.is_cuda() { "cuda" } else { "cpu" });
    Ok(device)
}
