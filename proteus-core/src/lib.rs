//! Core utilities and types shared across all Proteus crates

pub mod config;
pub mod error;
pub mod rng;
pub mod types;

// Re-export commonly used types
pub use config::{
    load_config, save_config, ClusteringConfig, DeviceChoice, ModelConfig, PipelineConfig,
    ReductionConfig, RuntimeConfig, TrainingConfig,
};
pub use error::{ProteusError, ProteusResult};
pub use rng::RunRng;

// Re-export core types
pub use types::{
    ClusterLabel, ClusterSummary, EmbeddingMatrix, MatrixStats, NoveltyScore, ReadId,
    NOISE_LABEL,
};

/// Version information for the Proteus project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
