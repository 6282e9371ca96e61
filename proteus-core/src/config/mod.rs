//! Configuration types for Proteus
//!
//! Every run parameter lives in one immutable [`PipelineConfig`]. Defaults
//! reproduce the constants the clustering pipeline has always trained with.

use crate::ProteusError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub reduction: ReductionConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Width of the latent mean / log-variance heads
    #[serde(default = "default_latent_dim")]
    pub latent_dim: usize,
    /// Width of the single hidden layer on both sides of the bottleneck
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// KL weight reached at the end of the warm-up
    #[serde(default = "default_beta_final")]
    pub beta_final: f64,
    /// Epochs over which beta ramps linearly up to `beta_final` (0 = no warm-up)
    #[serde(default = "default_beta_warmup_epochs")]
    pub beta_warmup_epochs: usize,
    /// Std of the Gaussian noise added to training inputs (0 disables it)
    #[serde(default = "default_input_noise_std")]
    pub input_noise_std: f64,
    /// Ceiling for the global gradient norm
    #[serde(default = "default_max_grad_norm")]
    pub max_grad_norm: f64,
    /// Latent spread below which posterior collapse is reported
    #[serde(default = "default_collapse_std_threshold")]
    pub collapse_std_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionConfig {
    /// Allow the neighbor-graph manifold tier (it is also gated by the `manifold` feature)
    #[serde(default = "default_manifold_enabled")]
    pub manifold_enabled: bool,
    #[serde(default = "default_manifold_components")]
    pub manifold_components: usize,
    #[serde(default = "default_manifold_neighbors")]
    pub manifold_neighbors: usize,
    #[serde(default = "default_manifold_min_dist")]
    pub manifold_min_dist: f64,
    /// Layout optimization epochs of the manifold tier
    #[serde(default = "default_manifold_epochs")]
    pub manifold_epochs: usize,
    #[serde(default = "default_pca_components")]
    pub pca_components: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Seed for the single random generator threaded through the run
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub device: DeviceChoice,
}

/// Where the tensor work of training and inference runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    /// CUDA when available, otherwise the host CPU
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl std::fmt::Display for DeviceChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceChoice::Auto => write!(f, "auto"),
            DeviceChoice::Cpu => write!(f, "cpu"),
            DeviceChoice::Cuda => write!(f, "cuda"),
        }
    }
}

// Default value functions
fn default_latent_dim() -> usize { 16 }
fn default_hidden_dim() -> usize { 256 }
fn default_batch_size() -> usize { 128 }
fn default_epochs() -> usize { 50 }
fn default_learning_rate() -> f64 { 1e-3 }
fn default_weight_decay() -> f64 { 1e-6 }
fn default_beta_final() -> f64 { 10.0 }
fn default_beta_warmup_epochs() -> usize { 10 }
fn default_input_noise_std() -> f64 { 0.01 }
fn default_max_grad_norm() -> f64 { 5.0 }
fn default_collapse_std_threshold() -> f64 { 1e-5 }
fn default_manifold_enabled() -> bool { true }
fn default_manifold_components() -> usize { 10 }
fn default_manifold_neighbors() -> usize { 15 }
fn default_manifold_min_dist() -> f64 { 0.1 }
fn default_manifold_epochs() -> usize { 200 }
fn default_pca_components() -> usize { 5 }
fn default_min_cluster_size() -> usize { 30 }
fn default_min_samples() -> usize { 10 }
fn default_seed() -> u64 { 42 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: default_latent_dim(),
            hidden_dim: default_hidden_dim(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            weight_decay: default_weight_decay(),
            beta_final: default_beta_final(),
            beta_warmup_epochs: default_beta_warmup_epochs(),
            input_noise_std: default_input_noise_std(),
            max_grad_norm: default_max_grad_norm(),
            collapse_std_threshold: default_collapse_std_threshold(),
        }
    }
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            manifold_enabled: default_manifold_enabled(),
            manifold_components: default_manifold_components(),
            manifold_neighbors: default_manifold_neighbors(),
            manifold_min_dist: default_manifold_min_dist(),
            manifold_epochs: default_manifold_epochs(),
            pca_components: default_pca_components(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: default_min_cluster_size(),
            min_samples: default_min_samples(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            device: DeviceChoice::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject parameter combinations no stage can run with
    pub fn validate(&self) -> Result<(), ProteusError> {
        let invalid = |msg: &str| Err(ProteusError::Configuration(msg.to_string()));

        if self.model.latent_dim == 0 || self.model.hidden_dim == 0 {
            return invalid("model dimensions must be positive");
        }
        let t = &self.training;
        if t.batch_size == 0 {
            return invalid("training.batch_size must be positive");
        }
        if t.epochs == 0 {
            return invalid("training.epochs must be positive");
        }
        if !(t.learning_rate > 0.0) || !t.learning_rate.is_finite() {
            return invalid("training.learning_rate must be a positive number");
        }
        if t.weight_decay < 0.0 || t.beta_final < 0.0 || t.input_noise_std < 0.0 {
            return invalid("training.weight_decay, beta_final and input_noise_std must not be negative");
        }
        if !(t.max_grad_norm > 0.0) {
            return invalid("training.max_grad_norm must be positive");
        }
        let r = &self.reduction;
        if r.manifold_components == 0 || r.pca_components == 0 {
            return invalid("reduction target widths must be positive");
        }
        if r.manifold_neighbors < 2 {
            return invalid("reduction.manifold_neighbors must be at least 2");
        }
        if r.manifold_min_dist < 0.0 {
            return invalid("reduction.manifold_min_dist must not be negative");
        }
        if self.clustering.min_cluster_size < 2 {
            return invalid("clustering.min_cluster_size must be at least 2");
        }
        if self.clustering.min_samples < 1 {
            return invalid("clustering.min_samples must be at least 1");
        }
        Ok(())
    }
}

pub fn default_config() -> PipelineConfig {
    PipelineConfig::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ProteusError> {
    let contents = std::fs::read_to_string(path)?;
    let config: PipelineConfig = toml::from_str(&contents)
        .map_err(|e| ProteusError::Configuration(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> Result<(), ProteusError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| ProteusError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
