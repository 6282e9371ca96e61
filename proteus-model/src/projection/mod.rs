//! Dimensionality-reduction fallback chain
//!
//! Strategies are tried in order until one yields a finite projection:
//! the neighbor-graph manifold layout, then PCA, then the standardized latent
//! matrix itself. Which tiers exist is decided once, in
//! [`ProjectionChain::detect`].

#[cfg(feature = "manifold")]
pub mod manifold;
pub mod passthrough;
pub mod pca;

use nalgebra::DMatrix;
use proteus_core::{ProteusError, ProteusResult, ReductionConfig, RunRng};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

pub use passthrough::Passthrough;
pub use pca::LinearProjection;

#[cfg(feature = "manifold")]
pub use manifold::ManifoldProjection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionTier {
    Manifold,
    Linear,
    Passthrough,
}

impl ProjectionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionTier::Manifold => "manifold",
            ProjectionTier::Linear => "linear",
            ProjectionTier::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for ProjectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a strategy produced no projection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProjectionFailure(pub String);

impl ProjectionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub trait ProjectionStrategy: Send + Sync {
    fn tier(&self) -> ProjectionTier;

    /// Project `data` (rows are points) or explain why it cannot
    fn attempt(&self, data: &DMatrix<f64>, rng: &mut RunRng) -> Result<DMatrix<f64>, ProjectionFailure>;
}

/// Stands in for a tier that is not compiled in or is switched off
pub struct Unavailable {
    tier: ProjectionTier,
    reason: String,
}

impl Unavailable {
    pub fn new(tier: ProjectionTier, reason: impl Into<String>) -> Self {
        Self {
            tier,
            reason: reason.into(),
        }
    }
}

impl ProjectionStrategy for Unavailable {
    fn tier(&self) -> ProjectionTier {
        self.tier
    }

    fn attempt(&self, _data: &DMatrix<f64>, _rng: &mut RunRng) -> Result<DMatrix<f64>, ProjectionFailure> {
        Err(ProjectionFailure(format!("unavailable: {}", self.reason)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub tier: ProjectionTier,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ProjectionOutcome {
    pub matrix: DMatrix<f64>,
    /// Tier that produced `matrix`
    pub tier: ProjectionTier,
    /// Tiers tried before it, in order
    pub failures: Vec<FailedAttempt>,
}

impl ProjectionOutcome {
    pub fn fell_back(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct ProjectionChain {
    strategies: Vec<Box<dyn ProjectionStrategy>>,
}

impl ProjectionChain {
    pub fn new(strategies: Vec<Box<dyn ProjectionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the standard three-tier chain for this configuration
    pub fn detect(config: &ReductionConfig) -> Self {
        let chain = Self::new(vec![
            manifold_tier(config),
            Box::new(LinearProjection::new(config.pca_components)),
            Box::new(Passthrough),
        ]);
        info!("Projection tiers: {}", chain.describe());
        chain
    }

    pub fn tiers(&self) -> Vec<ProjectionTier> {
        self.strategies.iter().map(|s| s.tier()).collect()
    }

    fn describe(&self) -> String {
        self.tiers()
            .iter()
            .map(ProjectionTier::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn project(&self, data: &DMatrix<f64>, rng: &mut RunRng) -> ProteusResult<ProjectionOutcome> {
        let mut failures = Vec::new();

        for (i, strategy) in self.strategies.iter().enumerate() {
            match strategy.attempt(data, rng) {
                Ok(matrix) => {
                    info!(
                        "{} projection: {} x {} -> {} x {}",
                        strategy.tier(),
                        data.nrows(),
                        data.ncols(),
                        matrix.nrows(),
                        matrix.ncols()
                    );
                    return Ok(ProjectionOutcome {
                        matrix,
                        tier: strategy.tier(),
                        failures,
                    });
                }
                Err(failure) => {
                    let next = self
                        .strategies
                        .get(i + 1)
                        .map(|s| s.tier().as_str())
                        .unwrap_or("nothing");
                    warn!(
                        "{} projection failed ({}); falling back to {}",
                        strategy.tier(),
                        failure,
                        next
                    );
                    failures.push(FailedAttempt {
                        tier: strategy.tier(),
                        reason: failure.0,
                    });
                }
            }
        }

        Err(ProteusError::Model(format!(
            "every projection tier failed ({} attempts)",
            failures.len()
        )))
    }
}

#[cfg(feature = "manifold")]
fn manifold_tier(config: &ReductionConfig) -> Box<dyn ProjectionStrategy> {
    if config.manifold_enabled {
        Box::new(ManifoldProjection::from_config(config))
    } else {
        Box::new(Unavailable::new(
            ProjectionTier::Manifold,
            "disabled by reduction.manifold_enabled",
        ))
    }
}

#[cfg(not(feature = "manifold"))]
fn manifold_tier(_config: &ReductionConfig) -> Box<dyn ProjectionStrategy> {
    Box::new(Unavailable::new(
        ProjectionTier::Manifold,
        "built without the `manifold` feature",
    ))
}

/// True when every entry is finite
pub(crate) fn all_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}
